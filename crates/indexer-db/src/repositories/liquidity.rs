use crate::models::DbLiquidityEvent;
use crate::Result;
use sqlx::PgPool;

pub struct LiquidityRepository;

impl LiquidityRepository {
    pub async fn bulk_insert(pool: &PgPool, events: &[DbLiquidityEvent]) -> Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }

        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        let tx_hashes: Vec<&str> = events.iter().map(|e| e.tx_hash.as_str()).collect();
        let log_indices: Vec<i64> = events.iter().map(|e| e.log_index).collect();
        let pairs: Vec<&str> = events.iter().map(|e| e.pair.as_str()).collect();
        let variants: Vec<i16> = events.iter().map(|e| e.variant).collect();
        let directions: Vec<i16> = events.iter().map(|e| e.direction).collect();
        let token0s: Vec<&str> = events.iter().map(|e| e.token0.as_str()).collect();
        let token1s: Vec<&str> = events.iter().map(|e| e.token1.as_str()).collect();
        let amount0s: Vec<&str> = events.iter().map(|e| e.amount0.as_str()).collect();
        let amount1s: Vec<&str> = events.iter().map(|e| e.amount1.as_str()).collect();
        let values_usd: Vec<f64> = events.iter().map(|e| e.value_usd).collect();
        let operators: Vec<&str> = events.iter().map(|e| e.operator.as_str()).collect();
        let block_numbers: Vec<i64> = events.iter().map(|e| e.block_number).collect();
        let block_times: Vec<i64> = events.iter().map(|e| e.block_time).collect();
        let gas_prices: Vec<&str> = events.iter().map(|e| e.gas_price.as_str()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO liquidity_events (id, tx_hash, log_index, pair, variant, direction, token0, token1,
                                          amount0, amount1, value_usd, operator, block_number, block_time,
                                          gas_price)
            SELECT * FROM UNNEST($1::text[], $2::text[], $3::bigint[], $4::text[], $5::smallint[],
                                 $6::smallint[], $7::text[], $8::text[], $9::text[], $10::text[],
                                 $11::float8[], $12::text[], $13::bigint[], $14::bigint[], $15::text[])
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(&tx_hashes)
        .bind(&log_indices)
        .bind(&pairs)
        .bind(&variants)
        .bind(&directions)
        .bind(&token0s)
        .bind(&token1s)
        .bind(&amount0s)
        .bind(&amount1s)
        .bind(&values_usd)
        .bind(&operators)
        .bind(&block_numbers)
        .bind(&block_times)
        .bind(&gas_prices)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_before(pool: &PgPool, before: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM liquidity_events WHERE block_time < $1")
            .bind(before)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

use crate::models::DbSwap;
use crate::Result;
use sqlx::PgPool;

/// Queries on the `swaps` table
pub struct TradeRepository;

impl TradeRepository {
    /// Bulk insert; rows already present are skipped. Returns the new row count.
    pub async fn bulk_insert(pool: &PgPool, swaps: &[DbSwap]) -> Result<u64> {
        if swaps.is_empty() {
            return Ok(0);
        }

        let ids: Vec<&str> = swaps.iter().map(|s| s.id.as_str()).collect();
        let tx_hashes: Vec<&str> = swaps.iter().map(|s| s.tx_hash.as_str()).collect();
        let log_indices: Vec<i64> = swaps.iter().map(|s| s.log_index).collect();
        let pairs: Vec<&str> = swaps.iter().map(|s| s.pair.as_str()).collect();
        let block_numbers: Vec<i64> = swaps.iter().map(|s| s.block_number).collect();
        let block_times: Vec<i64> = swaps.iter().map(|s| s.block_time).collect();
        let variants: Vec<i16> = swaps.iter().map(|s| s.variant).collect();
        let token0s: Vec<&str> = swaps.iter().map(|s| s.token0.as_str()).collect();
        let token1s: Vec<&str> = swaps.iter().map(|s| s.token1.as_str()).collect();
        let amount0_ins: Vec<&str> = swaps.iter().map(|s| s.amount0_in.as_str()).collect();
        let amount1_ins: Vec<&str> = swaps.iter().map(|s| s.amount1_in.as_str()).collect();
        let amount0_outs: Vec<&str> = swaps.iter().map(|s| s.amount0_out.as_str()).collect();
        let amount1_outs: Vec<&str> = swaps.iter().map(|s| s.amount1_out.as_str()).collect();
        let main_tokens: Vec<&str> = swaps.iter().map(|s| s.main_token.as_str()).collect();
        let main_amounts: Vec<f64> = swaps.iter().map(|s| s.main_amount).collect();
        let prices: Vec<f64> = swaps.iter().map(|s| s.price).collect();
        let prices_usd: Vec<f64> = swaps.iter().map(|s| s.price_usd).collect();
        let volumes_usd: Vec<f64> = swaps.iter().map(|s| s.volume_usd).collect();
        let directions: Vec<i16> = swaps.iter().map(|s| s.direction).collect();
        let senders: Vec<&str> = swaps.iter().map(|s| s.sender.as_str()).collect();
        let recipients: Vec<&str> = swaps.iter().map(|s| s.recipient.as_str()).collect();
        let operators: Vec<&str> = swaps.iter().map(|s| s.operator.as_str()).collect();
        let traders: Vec<Option<&str>> = swaps.iter().map(|s| s.trader.as_deref()).collect();
        let gas_prices: Vec<&str> = swaps.iter().map(|s| s.gas_price.as_str()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO swaps (id, tx_hash, log_index, pair, block_number, block_time, variant,
                               token0, token1, amount0_in, amount1_in, amount0_out, amount1_out,
                               main_token, main_amount, price, price_usd, volume_usd, direction,
                               sender, recipient, operator, trader, gas_price)
            SELECT * FROM UNNEST($1::text[], $2::text[], $3::bigint[], $4::text[], $5::bigint[], $6::bigint[],
                                 $7::smallint[], $8::text[], $9::text[], $10::text[], $11::text[], $12::text[],
                                 $13::text[], $14::text[], $15::float8[], $16::float8[], $17::float8[],
                                 $18::float8[], $19::smallint[], $20::text[], $21::text[], $22::text[],
                                 $23::text[], $24::text[])
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(&tx_hashes)
        .bind(&log_indices)
        .bind(&pairs)
        .bind(&block_numbers)
        .bind(&block_times)
        .bind(&variants)
        .bind(&token0s)
        .bind(&token1s)
        .bind(&amount0_ins)
        .bind(&amount1_ins)
        .bind(&amount0_outs)
        .bind(&amount1_outs)
        .bind(&main_tokens)
        .bind(&main_amounts)
        .bind(&prices)
        .bind(&prices_usd)
        .bind(&volumes_usd)
        .bind(&directions)
        .bind(&senders)
        .bind(&recipients)
        .bind(&operators)
        .bind(&traders)
        .bind(&gas_prices)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM swaps")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Delete swaps older than `before` (unix seconds)
    pub async fn delete_before(pool: &PgPool, before: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM swaps WHERE block_time < $1")
            .bind(before)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

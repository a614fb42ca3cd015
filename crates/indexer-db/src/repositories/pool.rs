use crate::models::{to_i64, DbPair};
use crate::Result;
use indexer_core::types::TradeStats;
use sqlx::PgPool;

const PAIR_COLUMNS: &str = "address, token0, token1, decimals0, decimals1, variant, fee, name, \
     created_block, created_tx, created_at, first_add_block, first_add_time, first_add_tx, \
     first_add_gas_price, liquidity_token0_usd, liquidity_token1_usd, liquidity_usd, price, \
     price_usd, tx_num_1h, tx_num_24h, tx_change_1h, tx_change_24h, volume_usd_1h, \
     volume_usd_24h, volume_change_1h, volume_change_24h, price_change_1h, price_change_24h, \
     stats_updated_at, hack_type";

/// Queries on the `pairs` table. Updates return false when the pair is unknown.
pub struct PoolRepository;

impl PoolRepository {
    pub async fn get(pool: &PgPool, address: &str) -> Result<Option<DbPair>> {
        let query = format!("SELECT {} FROM pairs WHERE address = $1", PAIR_COLUMNS);
        let result = sqlx::query_as::<_, DbPair>(&query)
            .bind(address)
            .fetch_optional(pool)
            .await?;
        Ok(result)
    }

    pub async fn get_all(pool: &PgPool) -> Result<Vec<DbPair>> {
        let query = format!("SELECT {} FROM pairs", PAIR_COLUMNS);
        let results = sqlx::query_as::<_, DbPair>(&query).fetch_all(pool).await?;
        Ok(results)
    }

    /// Insert a new pair, or refresh name, decimals and variant of a stored
    /// one. Creation fields are only overwritten by a known creation block.
    pub async fn upsert(pool: &PgPool, pair: &DbPair) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pairs (address, token0, token1, decimals0, decimals1, variant, fee, name,
                               created_block, created_tx, created_at, hack_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (address) DO UPDATE SET
                name = EXCLUDED.name,
                decimals0 = EXCLUDED.decimals0,
                decimals1 = EXCLUDED.decimals1,
                variant = EXCLUDED.variant,
                fee = CASE WHEN EXCLUDED.created_block > 0 THEN EXCLUDED.fee ELSE pairs.fee END,
                created_block = CASE WHEN EXCLUDED.created_block > 0 THEN EXCLUDED.created_block ELSE pairs.created_block END,
                created_tx = CASE WHEN EXCLUDED.created_block > 0 THEN EXCLUDED.created_tx ELSE pairs.created_tx END,
                created_at = CASE WHEN EXCLUDED.created_block > 0 THEN EXCLUDED.created_at ELSE pairs.created_at END
            "#,
        )
        .bind(&pair.address)
        .bind(&pair.token0)
        .bind(&pair.token1)
        .bind(pair.decimals0)
        .bind(pair.decimals1)
        .bind(pair.variant)
        .bind(pair.fee)
        .bind(&pair.name)
        .bind(pair.created_block)
        .bind(&pair.created_tx)
        .bind(pair.created_at)
        .bind(pair.hack_type)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Write every rolling statistic in one statement
    pub async fn update_stats(pool: &PgPool, address: &str, stats: &TradeStats) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pairs SET
                price = $2, price_usd = $3,
                tx_num_1h = $4, tx_num_24h = $5, tx_change_1h = $6, tx_change_24h = $7,
                volume_usd_1h = $8, volume_usd_24h = $9, volume_change_1h = $10, volume_change_24h = $11,
                price_change_1h = $12, price_change_24h = $13, stats_updated_at = $14
            WHERE address = $1
            "#,
        )
        .bind(address)
        .bind(stats.price)
        .bind(stats.price_usd)
        .bind(to_i64(stats.tx_num_1h))
        .bind(to_i64(stats.tx_num_24h))
        .bind(stats.tx_change_1h)
        .bind(stats.tx_change_24h)
        .bind(stats.volume_usd_1h)
        .bind(stats.volume_usd_24h)
        .bind(stats.volume_change_1h)
        .bind(stats.volume_change_24h)
        .bind(stats.price_change_1h)
        .bind(stats.price_change_24h)
        .bind(to_i64(stats.updated_at))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_liquidity(
        pool: &PgPool,
        address: &str,
        token0_usd: f64,
        token1_usd: f64,
        total_usd: f64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pairs SET liquidity_token0_usd = $2, liquidity_token1_usd = $3, liquidity_usd = $4
            WHERE address = $1
            "#,
        )
        .bind(address)
        .bind(token0_usd)
        .bind(token1_usd)
        .bind(total_usd)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the first liquidity addition unless an earlier one is stored.
    /// Pairs with an unknown creation block are left alone.
    pub async fn update_first_liquidity(
        pool: &PgPool,
        address: &str,
        block: i64,
        time: i64,
        tx_hash: &str,
        gas_price: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pairs SET
                first_add_block = $2, first_add_time = $3, first_add_tx = $4, first_add_gas_price = $5
            WHERE address = $1
              AND created_block > 0
              AND (first_add_block IS NULL OR first_add_block > $2)
            "#,
        )
        .bind(address)
        .bind(block)
        .bind(time)
        .bind(tx_hash)
        .bind(gas_price)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_hack_type(pool: &PgPool, address: &str, hack_type: i16) -> Result<bool> {
        let result = sqlx::query("UPDATE pairs SET hack_type = $2 WHERE address = $1")
            .bind(address)
            .bind(hack_type)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pairs")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}

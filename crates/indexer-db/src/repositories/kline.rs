use crate::models::DbKlineBucket;
use crate::Result;
use indexer_candles::KlinePeriod;
use sqlx::PgPool;

/// Candle bucket rows; the table follows the period
pub struct KlineRepository;

impl KlineRepository {
    pub async fn get(pool: &PgPool, period: KlinePeriod, key: &str) -> Result<Option<DbKlineBucket>> {
        let query = format!(
            "SELECT key, pair, base_token, quote_token, timestamp, slots FROM {} WHERE key = $1",
            period.table_name()
        );
        let result = sqlx::query_as::<_, DbKlineBucket>(&query)
            .bind(key)
            .fetch_optional(pool)
            .await?;
        Ok(result)
    }

    pub async fn upsert(pool: &PgPool, period: KlinePeriod, bucket: &DbKlineBucket) -> Result<()> {
        let query = format!(
            r#"
            INSERT INTO {} (key, pair, base_token, quote_token, timestamp, slots)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (key) DO UPDATE SET
                pair = EXCLUDED.pair,
                base_token = EXCLUDED.base_token,
                quote_token = EXCLUDED.quote_token,
                timestamp = EXCLUDED.timestamp,
                slots = EXCLUDED.slots
            "#,
            period.table_name()
        );

        sqlx::query(&query)
            .bind(&bucket.key)
            .bind(&bucket.pair)
            .bind(&bucket.base_token)
            .bind(&bucket.quote_token)
            .bind(bucket.timestamp)
            .bind(&bucket.slots)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Buckets of a pair whose reference time lies in `[start, end)`, oldest first
    pub async fn get_by_pair_range(
        pool: &PgPool,
        period: KlinePeriod,
        pair: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<DbKlineBucket>> {
        let query = format!(
            r#"
            SELECT key, pair, base_token, quote_token, timestamp, slots FROM {}
            WHERE pair = $1 AND timestamp >= $2 AND timestamp < $3
            ORDER BY timestamp ASC
            "#,
            period.table_name()
        );
        let results = sqlx::query_as::<_, DbKlineBucket>(&query)
            .bind(pair)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await?;
        Ok(results)
    }

    pub async fn delete_before(pool: &PgPool, period: KlinePeriod, before: i64) -> Result<u64> {
        let query = format!("DELETE FROM {} WHERE timestamp < $1", period.table_name());
        let result = sqlx::query(&query).bind(before).execute(pool).await?;
        Ok(result.rows_affected())
    }
}

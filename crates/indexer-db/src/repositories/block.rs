use crate::models::DbBlock;
use crate::Result;
use sqlx::PgPool;

pub struct BlockRepository;

impl BlockRepository {
    pub async fn exists(pool: &PgPool, number: i64) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM block_proceeded WHERE number = $1)")
                .bind(number)
                .fetch_one(pool)
                .await?;
        Ok(exists)
    }

    /// Insert the ledger row; false when the number or hash is already there
    pub async fn insert(pool: &PgPool, block: &DbBlock) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO block_proceeded (number, hash, timestamp, tx_num, volume_usd, native_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(block.number)
        .bind(&block.hash)
        .bind(block.timestamp)
        .bind(block.tx_num)
        .bind(block.volume_usd)
        .bind(block.native_price)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, number: i64) -> Result<()> {
        sqlx::query("DELETE FROM block_proceeded WHERE number = $1")
            .bind(number)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn get(pool: &PgPool, number: i64) -> Result<Option<DbBlock>> {
        let result = sqlx::query_as::<_, DbBlock>(
            "SELECT number, hash, timestamp, tx_num, volume_usd, native_price FROM block_proceeded WHERE number = $1",
        )
        .bind(number)
        .fetch_optional(pool)
        .await?;
        Ok(result)
    }

    /// Highest processed block number
    pub async fn latest(pool: &PgPool) -> Result<Option<i64>> {
        let (latest,): (Option<i64>,) = sqlx::query_as("SELECT MAX(number) FROM block_proceeded")
            .fetch_one(pool)
            .await?;
        Ok(latest)
    }
}

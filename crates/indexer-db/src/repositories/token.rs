use crate::models::DbToken;
use crate::Result;
use sqlx::PgPool;

pub struct TokenRepository;

impl TokenRepository {
    pub async fn get(pool: &PgPool, address: &str) -> Result<Option<DbToken>> {
        let result = sqlx::query_as::<_, DbToken>(
            "SELECT address, symbol, name, decimals, price_usd, total_supply FROM tokens WHERE address = $1",
        )
        .bind(address)
        .fetch_optional(pool)
        .await?;
        Ok(result)
    }

    /// Insert or refresh metadata. Stored nonzero decimals and the price are kept.
    pub async fn upsert(pool: &PgPool, token: &DbToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tokens (address, symbol, name, decimals, price_usd, total_supply)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (address) DO UPDATE SET
                symbol = EXCLUDED.symbol,
                name = EXCLUDED.name,
                total_supply = EXCLUDED.total_supply,
                decimals = CASE WHEN tokens.decimals = 0 THEN EXCLUDED.decimals ELSE tokens.decimals END,
                updated_at = NOW()
            "#,
        )
        .bind(&token.address)
        .bind(&token.symbol)
        .bind(&token.name)
        .bind(token.decimals)
        .bind(token.price_usd)
        .bind(&token.total_supply)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update_price(pool: &PgPool, address: &str, price_usd: f64) -> Result<()> {
        sqlx::query("UPDATE tokens SET price_usd = $2, updated_at = NOW() WHERE address = $1")
            .bind(address)
            .bind(price_usd)
            .execute(pool)
            .await?;
        Ok(())
    }
}

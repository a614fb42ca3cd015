use crate::models::DbTransfer;
use crate::Result;
use sqlx::PgPool;

pub struct TransferRepository;

impl TransferRepository {
    pub async fn bulk_insert(pool: &PgPool, transfers: &[DbTransfer]) -> Result<u64> {
        if transfers.is_empty() {
            return Ok(0);
        }

        let ids: Vec<&str> = transfers.iter().map(|t| t.id.as_str()).collect();
        let tx_hashes: Vec<&str> = transfers.iter().map(|t| t.tx_hash.as_str()).collect();
        let log_indices: Vec<i64> = transfers.iter().map(|t| t.log_index).collect();
        let tokens: Vec<&str> = transfers.iter().map(|t| t.token.as_str()).collect();
        let froms: Vec<&str> = transfers.iter().map(|t| t.from_address.as_str()).collect();
        let tos: Vec<&str> = transfers.iter().map(|t| t.to_address.as_str()).collect();
        let raw_amounts: Vec<&str> = transfers.iter().map(|t| t.raw_amount.as_str()).collect();
        let amounts: Vec<f64> = transfers.iter().map(|t| t.amount).collect();
        let values_usd: Vec<f64> = transfers.iter().map(|t| t.value_usd).collect();
        let kinds: Vec<i16> = transfers.iter().map(|t| t.kind).collect();
        let block_numbers: Vec<i64> = transfers.iter().map(|t| t.block_number).collect();
        let block_times: Vec<i64> = transfers.iter().map(|t| t.block_time).collect();
        let operators: Vec<&str> = transfers.iter().map(|t| t.operator.as_str()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO transfers (id, tx_hash, log_index, token, from_address, to_address, raw_amount,
                                   amount, value_usd, kind, block_number, block_time, operator)
            SELECT * FROM UNNEST($1::text[], $2::text[], $3::bigint[], $4::text[], $5::text[], $6::text[],
                                 $7::text[], $8::float8[], $9::float8[], $10::smallint[], $11::bigint[],
                                 $12::bigint[], $13::text[])
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(&tx_hashes)
        .bind(&log_indices)
        .bind(&tokens)
        .bind(&froms)
        .bind(&tos)
        .bind(&raw_amounts)
        .bind(&amounts)
        .bind(&values_usd)
        .bind(&kinds)
        .bind(&block_numbers)
        .bind(&block_times)
        .bind(&operators)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_before(pool: &PgPool, before: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM transfers WHERE block_time < $1")
            .bind(before)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

use super::{hex, parse_hash, to_i64, to_u64};
use crate::Result;
use indexer_core::types::BlockRecord;
use sqlx::FromRow;

/// Row of `block_proceeded`
#[derive(Debug, Clone, FromRow)]
pub struct DbBlock {
    pub number: i64,
    pub hash: String,
    pub timestamp: i64,
    pub tx_num: i64,
    pub volume_usd: f64,
    pub native_price: f64,
}

impl From<&BlockRecord> for DbBlock {
    fn from(record: &BlockRecord) -> Self {
        Self {
            number: to_i64(record.number),
            hash: hex(&record.hash),
            timestamp: to_i64(record.timestamp),
            tx_num: to_i64(record.tx_num),
            volume_usd: record.volume_usd,
            native_price: record.native_price,
        }
    }
}

impl DbBlock {
    pub fn into_record(self) -> Result<BlockRecord> {
        Ok(BlockRecord {
            number: to_u64(self.number),
            hash: parse_hash("hash", &self.hash)?,
            timestamp: to_u64(self.timestamp),
            tx_num: to_u64(self.tx_num),
            volume_usd: self.volume_usd,
            native_price: self.native_price,
        })
    }
}

use super::{hex, parse_address, to_i64, to_u64};
use crate::Result;
use indexer_candles::{Kline, KlineBucket};
use sqlx::types::Json;
use sqlx::FromRow;

/// Row of `kline_1min` / `kline_1hour`
#[derive(Debug, Clone, FromRow)]
pub struct DbKlineBucket {
    pub key: String,
    pub pair: String,
    pub base_token: String,
    pub quote_token: String,
    pub timestamp: i64,
    pub slots: Json<Vec<Kline>>,
}

impl From<&KlineBucket> for DbKlineBucket {
    fn from(bucket: &KlineBucket) -> Self {
        Self {
            key: bucket.key.clone(),
            pair: hex(&bucket.pair),
            base_token: hex(&bucket.base_token),
            quote_token: hex(&bucket.quote_token),
            timestamp: to_i64(bucket.timestamp),
            slots: Json(bucket.slots.clone()),
        }
    }
}

impl DbKlineBucket {
    pub fn into_bucket(self) -> Result<KlineBucket> {
        Ok(KlineBucket {
            key: self.key,
            pair: parse_address("pair", &self.pair)?,
            base_token: parse_address("base_token", &self.base_token)?,
            quote_token: parse_address("quote_token", &self.quote_token)?,
            timestamp: to_u64(self.timestamp),
            slots: self.slots.0,
        })
    }
}

pub mod aggregator;
pub mod bucket;
pub mod interval;
pub mod store;

pub use aggregator::KlineEngine;
pub use bucket::{Kline, KlineBucket, KlineTrade};
pub use interval::KlinePeriod;
pub use store::KlineStore;

use indexer_core::IndexerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CandleError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<CandleError> for IndexerError {
    fn from(err: CandleError) -> Self {
        IndexerError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CandleError>;

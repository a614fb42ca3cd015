//! Block processing: decode receipt logs, price and attribute swaps, persist
//! events and keep candles and pair statistics current.

pub mod attribution;
pub mod decoder;
pub mod deadline;
pub mod math;
mod pipeline;
pub mod resolver;
mod storage;
pub mod trade_stats;
pub mod valuation;

#[cfg(test)]
pub(crate) mod testing;

pub use attribution::Attribution;
pub use deadline::Deadlines;
pub use pipeline::{BlockProcessor, BlockSummary};
pub use resolver::MetadataResolver;
pub use storage::StorageHandles;

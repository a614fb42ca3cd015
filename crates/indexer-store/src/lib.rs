mod cache;
mod events;
mod klines;
mod ledger;
mod pairs;
mod store;
mod sync_state;

pub use cache::{CacheState, PairCache};
pub use events::EventStore;
pub use klines::KlineBucketStore;
pub use ledger::BlockStore;
pub use pairs::PairStore;
pub use store::IndexerStore;
pub use sync_state::{SyncMode, SyncState, SyncStats};

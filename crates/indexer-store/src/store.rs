use alloy_primitives::Address;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cache::PairCache;
use crate::events::EventStore;
use crate::klines::KlineBucketStore;
use crate::ledger::BlockStore;
use crate::pairs::PairStore;
use crate::sync_state::SyncState;

/// Thread-safe in-memory store for the indexer
#[derive(Debug)]
pub struct IndexerStore {
    pub ledger: Arc<BlockStore>,
    pub pairs: Arc<PairStore>,
    pub events: Arc<EventStore>,
    pub klines: Arc<KlineBucketStore>,
    pub cache: Arc<PairCache>,
    pub sync_state: Arc<RwLock<SyncState>>,
}

impl IndexerStore {
    pub fn new() -> Self {
        Self::with_cache(PairCache::default())
    }

    /// Store whose pair cache is seeded with the configured swap contracts
    pub fn with_swap_contracts(contracts: impl IntoIterator<Item = Address>) -> Self {
        Self::with_cache(PairCache::new(contracts))
    }

    pub fn with_cache(cache: PairCache) -> Self {
        Self {
            ledger: Arc::new(BlockStore::new()),
            pairs: Arc::new(PairStore::new()),
            events: Arc::new(EventStore::new()),
            klines: Arc::new(KlineBucketStore::new()),
            cache: Arc::new(cache),
            sync_state: Arc::new(RwLock::new(SyncState::default())),
        }
    }
}

impl Default for IndexerStore {
    fn default() -> Self {
        Self::new()
    }
}

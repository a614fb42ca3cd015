use indexer_candles::KlineStore;
use indexer_core::{BlockLedger, EventRepository, PairRepository};
use indexer_store::IndexerStore;
use std::sync::Arc;

/// The storage collaborators a block processor writes through
#[derive(Clone)]
pub struct StorageHandles {
    pub ledger: Arc<dyn BlockLedger>,
    pub pairs: Arc<dyn PairRepository>,
    pub events: Arc<dyn EventRepository>,
    pub klines: Arc<dyn KlineStore>,
}

impl StorageHandles {
    /// Handles backed by the in-memory store
    pub fn in_memory(store: &IndexerStore) -> Self {
        Self {
            ledger: store.ledger.clone(),
            pairs: store.pairs.clone(),
            events: store.events.clone(),
            klines: store.klines.clone(),
        }
    }

    /// One backend implementing every storage trait
    pub fn shared<S>(backend: Arc<S>) -> Self
    where
        S: BlockLedger + PairRepository + EventRepository + KlineStore + 'static,
    {
        Self {
            ledger: backend.clone(),
            pairs: backend.clone(),
            events: backend.clone(),
            klines: backend,
        }
    }
}

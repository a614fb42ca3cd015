use alloy_primitives::B256;
use async_trait::async_trait;
use dashmap::DashMap;
use indexer_core::types::BlockRecord;
use indexer_core::{BlockLedger, Result};
use tracing::debug;

/// In-memory block ledger, unique on number and on hash
#[derive(Debug, Default)]
pub struct BlockStore {
    blocks: DashMap<u64, BlockRecord>,
    hash_index: DashMap<B256, u64>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, number: u64) -> Option<BlockRecord> {
        self.blocks.get(&number).map(|r| r.clone())
    }

    pub fn count(&self) -> usize {
        self.blocks.len()
    }

    /// Highest processed block number
    pub fn latest(&self) -> Option<u64> {
        self.blocks.iter().map(|e| *e.key()).max()
    }
}

#[async_trait]
impl BlockLedger for BlockStore {
    async fn is_processed(&self, number: u64) -> Result<bool> {
        Ok(self.blocks.contains_key(&number))
    }

    async fn mark_processed(&self, record: &BlockRecord) -> Result<bool> {
        if self.hash_index.contains_key(&record.hash) {
            return Ok(false);
        }
        match self.blocks.entry(record.number) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record.clone());
                self.hash_index.insert(record.hash, record.number);
                debug!(
                    block = record.number,
                    swaps = record.tx_num,
                    total_blocks = self.blocks.len(),
                    "Block marked processed"
                );
                Ok(true)
            }
        }
    }

    async fn unmark(&self, number: u64) -> Result<()> {
        if let Some((_, record)) = self.blocks.remove(&number) {
            self.hash_index.remove(&record.hash);
        }
        Ok(())
    }
}

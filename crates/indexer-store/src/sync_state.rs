/// Which scheduler path is currently running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    #[default]
    Backfill,
    Live,
}

/// Sync statistics
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub blocks_processed: u64,
    pub blocks_skipped: u64,
    pub blocks_failed: u64,
    pub swaps_indexed: u64,
    pub transfers_indexed: u64,
    pub liquidity_events_indexed: u64,
    pub pairs_discovered: u64,
}

/// Sync state tracking
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    /// Highest block number marked processed
    pub last_processed_block: u64,

    /// Latest chain head seen by either path
    pub head_block: u64,

    /// Blocks admitted to the backfill pool and not yet finished
    pub backfill_in_flight: usize,

    pub backfill_complete: bool,

    pub mode: SyncMode,

    pub stats: SyncStats,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_head(&mut self, head: u64) {
        self.head_block = self.head_block.max(head);
    }

    /// Record a processed block; blocks complete out of order
    pub fn record_block(&mut self, number: u64) {
        self.last_processed_block = self.last_processed_block.max(number);
        self.stats.blocks_processed += 1;
    }

    pub fn record_skip(&mut self) {
        self.stats.blocks_skipped += 1;
    }

    pub fn record_failure(&mut self) {
        self.stats.blocks_failed += 1;
    }

    pub fn record_events(&mut self, swaps: u64, transfers: u64, liquidity: u64) {
        self.stats.swaps_indexed += swaps;
        self.stats.transfers_indexed += transfers;
        self.stats.liquidity_events_indexed += liquidity;
    }

    pub fn record_pairs(&mut self, count: u64) {
        self.stats.pairs_discovered += count;
    }

    /// Mark backfill as complete
    pub fn complete_backfill(&mut self) {
        self.backfill_complete = true;
        self.backfill_in_flight = 0;
        self.mode = SyncMode::Live;
    }

    /// Blocks between the last processed block and the head
    pub fn lag(&self) -> u64 {
        self.head_block.saturating_sub(self.last_processed_block)
    }

    pub fn is_syncing(&self) -> bool {
        !self.backfill_complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_completion() {
        let mut state = SyncState::new();
        state.observe_head(110);
        state.record_block(105);
        state.record_block(103);
        assert_eq!(state.last_processed_block, 105);
        assert_eq!(state.stats.blocks_processed, 2);
        assert_eq!(state.lag(), 5);
    }

    #[test]
    fn test_complete_backfill_switches_mode() {
        let mut state = SyncState::new();
        assert!(state.is_syncing());
        state.backfill_in_flight = 3;
        state.complete_backfill();
        assert_eq!(state.mode, SyncMode::Live);
        assert_eq!(state.backfill_in_flight, 0);
        assert!(!state.is_syncing());
    }
}

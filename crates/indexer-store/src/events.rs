use alloy_primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use indexer_core::types::{EventKey, LiquidityEvent, Swap, Transfer};
use indexer_core::{EventRepository, Result};
use std::time::Instant;
use tracing::debug;

/// Thread-safe store for swaps, transfers and liquidity events.
/// Every record is keyed by (tx_hash, log_index); duplicates are ignored.
#[derive(Debug, Default)]
pub struct EventStore {
    swaps: DashMap<EventKey, Swap>,
    /// pair -> swap keys (insertion order)
    pair_swaps: DashMap<Address, Vec<EventKey>>,
    /// trader -> swap keys
    trader_swaps: DashMap<Address, Vec<EventKey>>,
    transfers: DashMap<EventKey, Transfer>,
    liquidity: DashMap<EventKey, LiquidityEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn swap(&self, key: &EventKey) -> Option<Swap> {
        self.swaps.get(key).map(|s| s.clone())
    }

    pub fn transfer(&self, key: &EventKey) -> Option<Transfer> {
        self.transfers.get(key).map(|t| t.clone())
    }

    /// Get recent swaps for a pair
    pub fn pair_swaps(&self, pair: &Address, limit: usize) -> Vec<Swap> {
        self.pair_swaps
            .get(pair)
            .map(|keys| {
                keys.iter()
                    .rev()
                    .take(limit)
                    .filter_map(|key| self.swaps.get(key).map(|s| s.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get recent swaps attributed to a trader
    pub fn trader_swaps(&self, trader: &Address, limit: usize) -> Vec<Swap> {
        self.trader_swaps
            .get(trader)
            .map(|keys| {
                keys.iter()
                    .rev()
                    .take(limit)
                    .filter_map(|key| self.swaps.get(key).map(|s| s.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn swap_count(&self) -> usize {
        self.swaps.len()
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    pub fn liquidity_count(&self) -> usize {
        self.liquidity.len()
    }

    fn insert_swap(&self, swap: &Swap) -> bool {
        if self.swaps.contains_key(&swap.key) {
            return false;
        }

        self.pair_swaps
            .entry(swap.pair)
            .or_insert_with(Vec::new)
            .push(swap.key);

        if let Some(trader) = swap.trader {
            self.trader_swaps
                .entry(trader)
                .or_insert_with(Vec::new)
                .push(swap.key);
        }

        self.swaps.insert(swap.key, swap.clone());
        true
    }
}

#[async_trait]
impl EventRepository for EventStore {
    async fn insert_swaps(&self, swaps: &[Swap]) -> Result<u64> {
        let start = Instant::now();
        let inserted = swaps.iter().filter(|s| self.insert_swap(s)).count() as u64;

        debug!(
            inserted = inserted,
            duplicates = swaps.len() as u64 - inserted,
            total_swaps = self.swaps.len(),
            total_us = start.elapsed().as_micros(),
            "Swaps stored in memory"
        );
        Ok(inserted)
    }

    async fn insert_transfers(&self, transfers: &[Transfer]) -> Result<u64> {
        let mut inserted = 0;
        for transfer in transfers {
            if let dashmap::mapref::entry::Entry::Vacant(slot) = self.transfers.entry(transfer.key)
            {
                slot.insert(transfer.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn insert_liquidity_events(&self, events: &[LiquidityEvent]) -> Result<u64> {
        let mut inserted = 0;
        for event in events {
            if let dashmap::mapref::entry::Entry::Vacant(slot) = self.liquidity.entry(event.key) {
                slot.insert(event.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

use alloy_primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use indexer_core::types::{FirstLiquidity, HackType, Pair, PoolLiquidity, Token, TradeStats};
use indexer_core::{IndexerError, PairRepository, Result};
use std::time::Instant;
use tracing::debug;

/// Thread-safe store for pairs and token metadata
#[derive(Debug, Default)]
pub struct PairStore {
    pairs: DashMap<Address, Pair>,
    tokens: DashMap<Address, Token>,
}

impl PairStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn with_pair<F>(&self, address: Address, update: F) -> Result<()>
    where
        F: FnOnce(&mut Pair),
    {
        let mut pair = self
            .pairs
            .get_mut(&address)
            .ok_or(IndexerError::PairNotFound(address))?;
        update(&mut pair);
        Ok(())
    }
}

#[async_trait]
impl PairRepository for PairStore {
    async fn pair(&self, address: Address) -> Result<Option<Pair>> {
        Ok(self.pairs.get(&address).map(|p| p.clone()))
    }

    async fn all_pairs(&self) -> Result<Vec<Pair>> {
        Ok(self.pairs.iter().map(|e| e.value().clone()).collect())
    }

    async fn save_pair(&self, pair: &Pair) -> Result<()> {
        let start = Instant::now();
        self.pairs
            .entry(pair.address)
            .and_modify(|existing| {
                existing.name = pair.name.clone();
                existing.decimals0 = pair.decimals0;
                existing.decimals1 = pair.decimals1;
                existing.variant = pair.variant;
                if pair.created_block > 0 {
                    existing.created_block = pair.created_block;
                    existing.created_tx = pair.created_tx;
                    existing.created_at = pair.created_at;
                    existing.fee = pair.fee;
                }
            })
            .or_insert_with(|| pair.clone());

        debug!(
            pair = ?pair.address,
            name = %pair.name,
            total_pairs = self.pairs.len(),
            insert_us = start.elapsed().as_micros(),
            "Pair saved into memory store"
        );
        Ok(())
    }

    async fn token(&self, address: Address) -> Result<Option<Token>> {
        Ok(self.tokens.get(&address).map(|t| t.clone()))
    }

    async fn save_token(&self, token: &Token) -> Result<()> {
        self.tokens
            .entry(token.address)
            .and_modify(|existing| {
                existing.symbol = token.symbol.clone();
                existing.name = token.name.clone();
                existing.total_supply = token.total_supply.clone();
                if existing.decimals == 0 {
                    existing.decimals = token.decimals;
                }
            })
            .or_insert_with(|| token.clone());
        Ok(())
    }

    async fn update_token_price(&self, address: Address, price_usd: f64) -> Result<()> {
        if let Some(mut token) = self.tokens.get_mut(&address) {
            token.price_usd = price_usd;
        }
        Ok(())
    }

    async fn update_trade_stats(&self, address: Address, stats: &TradeStats) -> Result<()> {
        self.with_pair(address, |pair| pair.stats = *stats)
    }

    async fn update_liquidity(&self, address: Address, liquidity: &PoolLiquidity) -> Result<()> {
        self.with_pair(address, |pair| pair.liquidity = *liquidity)
    }

    async fn update_first_liquidity(
        &self,
        address: Address,
        first: &FirstLiquidity,
    ) -> Result<()> {
        self.with_pair(address, |pair| {
            pair.observe_first_add(*first);
        })
    }

    async fn update_hack_type(&self, address: Address, hack_type: HackType) -> Result<()> {
        self.with_pair(address, |pair| pair.hack_type = hack_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexer_core::types::ProtocolVariant;

    fn token(decimals: u8) -> Token {
        Token {
            address: Address::repeat_byte(9),
            symbol: "PEPE".to_string(),
            name: "Pepe".to_string(),
            decimals,
            price_usd: 0.0,
            total_supply: "1000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_token_decimals_immutable() {
        let store = PairStore::new();
        store.save_token(&token(18)).await.unwrap();

        let mut changed = token(6);
        changed.symbol = "PEPE2".to_string();
        store.save_token(&changed).await.unwrap();

        let stored = store.token(Address::repeat_byte(9)).await.unwrap().unwrap();
        assert_eq!(stored.decimals, 18);
        assert_eq!(stored.symbol, "PEPE2");
    }

    #[tokio::test]
    async fn test_stats_update_on_missing_pair() {
        let store = PairStore::new();
        let err = store
            .update_trade_stats(Address::repeat_byte(1), &TradeStats::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::PairNotFound(_)));
    }

    #[tokio::test]
    async fn test_save_pair_keeps_statistics() {
        let store = PairStore::new();
        let pair = Pair::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
            ProtocolVariant::V2,
        );
        store.save_pair(&pair).await.unwrap();

        let stats = TradeStats {
            tx_num_1h: 5,
            ..Default::default()
        };
        store.update_trade_stats(pair.address, &stats).await.unwrap();
        store.save_pair(&pair).await.unwrap();

        let stored = store.pair(pair.address).await.unwrap().unwrap();
        assert_eq!(stored.stats.tx_num_1h, 5);
    }
}

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    BlockRecord, FirstLiquidity, HackType, LiquidityEvent, Pair, PoolLiquidity, Swap, Token,
    TradeStats, Transfer,
};

/// Source of truth for "already processed"
#[async_trait]
pub trait BlockLedger: Send + Sync {
    async fn is_processed(&self, number: u64) -> Result<bool>;

    /// Returns false when the number or hash is already recorded
    async fn mark_processed(&self, record: &BlockRecord) -> Result<bool>;

    async fn unmark(&self, number: u64) -> Result<()>;
}

#[async_trait]
pub trait PairRepository: Send + Sync {
    async fn pair(&self, address: Address) -> Result<Option<Pair>>;

    async fn all_pairs(&self) -> Result<Vec<Pair>>;

    /// Insert, or refresh metadata of an existing pair
    async fn save_pair(&self, pair: &Pair) -> Result<()>;

    async fn token(&self, address: Address) -> Result<Option<Token>>;

    /// Insert, or refresh an existing token; stored decimals are never overwritten
    async fn save_token(&self, token: &Token) -> Result<()>;

    async fn update_token_price(&self, address: Address, price_usd: f64) -> Result<()>;

    /// Replace all rolling statistics of a pair in one write
    async fn update_trade_stats(&self, address: Address, stats: &TradeStats) -> Result<()>;

    async fn update_liquidity(&self, address: Address, liquidity: &PoolLiquidity) -> Result<()>;

    /// Keep the earliest of the stored and the given first addition
    async fn update_first_liquidity(&self, address: Address, first: &FirstLiquidity)
        -> Result<()>;

    async fn update_hack_type(&self, address: Address, hack_type: HackType) -> Result<()>;
}

/// Immutable log-derived records, unique on (tx_hash, log_index)
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Returns the number of newly stored rows; duplicates are ignored
    async fn insert_swaps(&self, swaps: &[Swap]) -> Result<u64>;

    async fn insert_transfers(&self, transfers: &[Transfer]) -> Result<u64>;

    async fn insert_liquidity_events(&self, events: &[LiquidityEvent]) -> Result<u64>;
}

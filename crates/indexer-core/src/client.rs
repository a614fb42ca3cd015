use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChainBlock, ChainLog, ProtocolVariant};

/// Arguments of a simulated buy/sell through a pair on the hack-check contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HackProbe {
    pub checker: Address,
    pub pair: Address,
    /// Native-wrapped side spent by the simulation
    pub token_in: Address,
    pub token_out: Address,
    pub token0: Address,
    pub amount: U256,
    /// 1 checks a clean round trip, 2 tolerates transfer fees
    pub div_factor: U256,
}

/// Read-only access to an EVM chain
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn head_number(&self) -> Result<u64>;

    /// Header and transactions of a block; transaction logs are left empty.
    /// `None` when the node does not have the block yet.
    async fn block(&self, number: u64) -> Result<Option<ChainBlock>>;

    async fn receipt_logs(&self, tx_hash: B256) -> Result<Vec<ChainLog>>;

    async fn token_decimals(&self, token: Address) -> Result<u8>;

    /// Name, falling back to a `bytes32` encoding
    async fn token_name(&self, token: Address) -> Result<String>;

    /// Symbol, falling back to a `bytes32` encoding
    async fn token_symbol(&self, token: Address) -> Result<String>;

    async fn token_total_supply(&self, token: Address) -> Result<U256>;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256>;

    /// `token0()` and `token1()` of a pool
    async fn pair_tokens(&self, pair: Address) -> Result<(Address, Address)>;

    /// Probe `kLast()` then `maxLiquidityPerTick()`
    async fn pool_variant(&self, pair: Address) -> Result<ProtocolVariant>;

    /// `Ok(true)` when the simulated trade executes, `Ok(false)` when it reverts
    async fn hack_probe(&self, probe: &HackProbe) -> Result<bool>;
}

/// Native asset fiat price
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// `None` asks for the current price
    async fn native_price(&self, height: Option<u64>) -> Result<f64>;
}

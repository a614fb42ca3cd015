use alloy_primitives::{Address, U256};

use super::{Direction, EventKey, ProtocolVariant};

/// Add/remove liquidity action on a pair
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityEvent {
    pub key: EventKey,
    pub pair: Address,
    pub variant: ProtocolVariant,
    /// `BuyOrAdd` for mints, `SellOrRemove` for burns
    pub direction: Direction,
    pub token0: Address,
    pub token1: Address,
    pub amount0: U256,
    pub amount1: U256,
    pub value_usd: f64,
    pub operator: Address,
    pub block_number: u64,
    pub block_time: u64,
    pub gas_price: u128,
}

impl LiquidityEvent {
    pub fn is_add(&self) -> bool {
        self.direction == Direction::BuyOrAdd
    }
}

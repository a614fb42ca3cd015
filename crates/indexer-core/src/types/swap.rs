use alloy_primitives::{Address, U256};

use super::{EventKey, ProtocolVariant};

/// Trade direction; liquidity events reuse buy/sell as add/remove
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Unknown,
    BuyOrAdd,
    SellOrRemove,
    /// Self-cancelling round trip
    Arbitrage,
    /// Receipt too large for trader attribution
    TooComplicated,
}

impl Direction {
    pub const fn as_i16(&self) -> i16 {
        match self {
            Direction::Unknown => 0,
            Direction::BuyOrAdd => 1,
            Direction::SellOrRemove => 2,
            Direction::Arbitrage => 3,
            Direction::TooComplicated => 4,
        }
    }

    pub const fn from_i16(value: i16) -> Self {
        match value {
            1 => Direction::BuyOrAdd,
            2 => Direction::SellOrRemove,
            3 => Direction::Arbitrage,
            4 => Direction::TooComplicated,
            _ => Direction::Unknown,
        }
    }
}

/// One decoded trade
#[derive(Debug, Clone, PartialEq)]
pub struct Swap {
    pub key: EventKey,
    pub pair: Address,
    pub block_number: u64,
    pub block_time: u64,
    pub variant: ProtocolVariant,
    pub token0: Address,
    pub token1: Address,
    /// Raw amounts entering/leaving the pool per side
    pub amount0_in: U256,
    pub amount1_in: U256,
    pub amount0_out: U256,
    pub amount1_out: U256,
    /// Non-quote side of the pair
    pub main_token: Address,
    pub main_amount: f64,
    /// Main token price in quote token units
    pub price: f64,
    pub price_usd: f64,
    pub volume_usd: f64,
    pub direction: Direction,
    pub sender: Address,
    pub recipient: Address,
    /// Transaction signer
    pub operator: Address,
    /// Attributed economic beneficiary
    pub trader: Option<Address>,
    pub gas_price: u128,
}

impl Swap {
    pub fn quote_token(&self) -> Address {
        if self.main_token == self.token0 {
            self.token1
        } else {
            self.token0
        }
    }
}

use alloy_primitives::{Address, U256};

use super::EventKey;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TransferKind {
    #[default]
    Unknown,
    /// Plain movement of funds
    Transfer,
    /// Leg of a swap transaction
    Swap,
}

impl TransferKind {
    pub const fn as_i16(&self) -> i16 {
        match self {
            TransferKind::Unknown => 0,
            TransferKind::Transfer => 1,
            TransferKind::Swap => 2,
        }
    }

    pub const fn from_i16(value: i16) -> Self {
        match value {
            1 => TransferKind::Transfer,
            2 => TransferKind::Swap,
            _ => TransferKind::Unknown,
        }
    }
}

/// One ERC-20 Transfer log
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub key: EventKey,
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub raw_amount: U256,
    /// Decimal-adjusted amount
    pub amount: f64,
    /// Filled once the block's swap prices are known
    pub value_usd: f64,
    pub kind: TransferKind,
    pub block_number: u64,
    pub block_time: u64,
    pub operator: Address,
}

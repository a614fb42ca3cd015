mod block;
mod event;
mod kline;
mod pair;
mod token;

pub use block::DbBlock;
pub use event::{DbLiquidityEvent, DbSwap, DbTransfer};
pub use kline::DbKlineBucket;
pub use pair::DbPair;
pub use token::DbToken;

use crate::{DatabaseError, Result};
use alloy_primitives::{Address, B256, U256};
use std::str::FromStr;

/// Lowercase `0x` hex, the storage form of every address and hash
pub fn hex<T: std::fmt::LowerHex>(value: &T) -> String {
    format!("{:#x}", value)
}

pub(crate) fn parse_address(column: &str, value: &str) -> Result<Address> {
    Address::from_str(value)
        .map_err(|e| DatabaseError::Serialization(format!("{column} = {value:?}: {e}")))
}

pub(crate) fn parse_hash(column: &str, value: &str) -> Result<B256> {
    B256::from_str(value)
        .map_err(|e| DatabaseError::Serialization(format!("{column} = {value:?}: {e}")))
}

pub(crate) fn parse_u256(column: &str, value: &str) -> Result<U256> {
    U256::from_str(value)
        .map_err(|e| DatabaseError::Serialization(format!("{column} = {value:?}: {e}")))
}

pub(crate) fn parse_u128(column: &str, value: &str) -> Result<u128> {
    value
        .parse()
        .map_err(|e| DatabaseError::Serialization(format!("{column} = {value:?}: {e}")))
}

/// Unsigned columns are stored as BIGINT
pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

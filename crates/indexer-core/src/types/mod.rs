mod block;
mod chain;
mod liquidity;
mod pair;
mod swap;
mod token;
mod transfer;

pub use block::BlockRecord;
pub use chain::{ChainBlock, ChainLog, ChainTransaction};
pub use liquidity::LiquidityEvent;
pub use pair::{FirstLiquidity, HackType, Pair, PoolLiquidity, ProtocolVariant, TradeStats};
pub use swap::{Direction, Swap};
pub use token::Token;
pub use transfer::{Transfer, TransferKind};

use alloy_primitives::B256;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique key for log-derived records (tx_hash + log_index)
/// Same event processed twice = same key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub tx_hash: B256,
    pub log_index: u64,
}

impl EventKey {
    pub fn new(tx_hash: B256, log_index: u64) -> Self {
        Self { tx_hash, log_index }
    }

    /// Storage id, `"{tx_hash}_{log_index}"`
    pub fn id(&self) -> String {
        format!("{:?}_{}", self.tx_hash, self.log_index)
    }
}

/// Get current timestamp in seconds since Unix epoch
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key_id() {
        let key = EventKey::new(B256::repeat_byte(0xab), 7);
        let id = key.id();
        assert!(id.starts_with("0xabab"));
        assert!(id.ends_with("_7"));
        assert_eq!(id.len(), 66 + 2);
    }
}

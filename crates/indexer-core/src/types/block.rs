use alloy_primitives::B256;

/// Durable marker proving a block was fully processed
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRecord {
    pub number: u64,
    pub hash: B256,
    pub timestamp: u64,
    /// Number of swaps decoded in the block
    pub tx_num: u64,
    pub volume_usd: f64,
    /// Native asset fiat price the block was valued with
    pub native_price: f64,
}

use alloy_primitives::{Address, LogData, B256};

/// A log as delivered by a transaction receipt
#[derive(Debug, Clone)]
pub struct ChainLog {
    pub address: Address,
    pub data: LogData,
    /// Position of the log within the block
    pub log_index: u64,
}

impl ChainLog {
    pub fn topic0(&self) -> Option<&B256> {
        self.data.topics().first()
    }
}

/// A transaction with the logs of its receipt
#[derive(Debug, Clone)]
pub struct ChainTransaction {
    pub hash: B256,
    /// Recovered signer
    pub from: Address,
    pub gas_price: u128,
    /// False for plain value transfers (empty calldata)
    pub has_input: bool,
    pub logs: Vec<ChainLog>,
}

/// A block with its transactions and, once fetched, their receipt logs
#[derive(Debug, Clone)]
pub struct ChainBlock {
    pub number: u64,
    pub hash: B256,
    pub timestamp: u64,
    pub transactions: Vec<ChainTransaction>,
}

impl ChainBlock {
    pub fn log_count(&self) -> usize {
        self.transactions.iter().map(|tx| tx.logs.len()).sum()
    }
}

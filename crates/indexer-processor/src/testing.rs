//! In-memory chain used by the processor tests.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use indexer_core::types::{ChainBlock, ChainLog, ChainTransaction, ProtocolVariant};
use indexer_core::{ChainClient, HackProbe, IndexerError, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub(crate) struct FakeChain {
    blocks: HashMap<u64, ChainBlock>,
    receipts: HashMap<B256, Vec<ChainLog>>,
    failing_receipts: HashSet<B256>,
    tokens: HashMap<Address, (String, u8)>,
    pairs: HashMap<Address, (Address, Address, ProtocolVariant)>,
    balances: HashMap<(Address, Address), U256>,
    probes: HashMap<U256, bool>,
}

impl FakeChain {
    /// Stores the block; its transaction logs become the receipts
    pub(crate) fn add_block(&mut self, block: ChainBlock) {
        for tx in &block.transactions {
            self.receipts.insert(tx.hash, tx.logs.clone());
        }
        self.blocks.insert(block.number, block);
    }

    pub(crate) fn fail_receipt(&mut self, tx_hash: B256) {
        self.failing_receipts.insert(tx_hash);
    }

    pub(crate) fn add_token(&mut self, token: Address, symbol: &str, decimals: u8) {
        self.tokens.insert(token, (symbol.to_string(), decimals));
    }

    pub(crate) fn add_pair(&mut self, pair: Address, token0: Address, token1: Address, variant: ProtocolVariant) {
        self.pairs.insert(pair, (token0, token1, variant));
    }

    pub(crate) fn set_balance(&mut self, token: Address, owner: Address, balance: U256) {
        self.balances.insert((token, owner), balance);
    }

    /// Outcome of the hack probe run with `div_factor`
    pub(crate) fn set_probe(&mut self, div_factor: u64, executes: bool) {
        self.probes.insert(U256::from(div_factor), executes);
    }

    fn token_entry(&self, token: Address) -> Result<&(String, u8)> {
        self.tokens
            .get(&token)
            .ok_or_else(|| IndexerError::Rpc(format!("execution reverted: {}", token)))
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn head_number(&self) -> Result<u64> {
        Ok(self.blocks.keys().copied().max().unwrap_or_default())
    }

    async fn block(&self, number: u64) -> Result<Option<ChainBlock>> {
        Ok(self.blocks.get(&number).map(|block| {
            let mut block = block.clone();
            for tx in &mut block.transactions {
                tx.logs.clear();
            }
            block
        }))
    }

    async fn receipt_logs(&self, tx_hash: B256) -> Result<Vec<ChainLog>> {
        if self.failing_receipts.contains(&tx_hash) {
            return Err(IndexerError::Rpc(format!("receipt {} unavailable", tx_hash)));
        }
        self.receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| IndexerError::Rpc(format!("unknown transaction {}", tx_hash)))
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        Ok(self.token_entry(token)?.1)
    }

    async fn token_name(&self, token: Address) -> Result<String> {
        Ok(self.token_entry(token)?.0.clone())
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        Ok(self.token_entry(token)?.0.clone())
    }

    async fn token_total_supply(&self, token: Address) -> Result<U256> {
        self.token_entry(token)?;
        Ok(U256::from(1_000_000u64))
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        Ok(self.balances.get(&(token, owner)).copied().unwrap_or_default())
    }

    async fn pair_tokens(&self, pair: Address) -> Result<(Address, Address)> {
        self.pairs
            .get(&pair)
            .map(|(token0, token1, _)| (*token0, *token1))
            .ok_or_else(|| IndexerError::Rpc(format!("execution reverted: {}", pair)))
    }

    async fn pool_variant(&self, pair: Address) -> Result<ProtocolVariant> {
        Ok(self
            .pairs
            .get(&pair)
            .map(|(_, _, variant)| *variant)
            .unwrap_or_default())
    }

    async fn hack_probe(&self, probe: &HackProbe) -> Result<bool> {
        self.probes
            .get(&probe.div_factor)
            .copied()
            .ok_or_else(|| IndexerError::Rpc("hack probe not configured".to_string()))
    }
}

/// Builds a contract-call transaction with its receipt logs
pub(crate) struct TxBuilder {
    tx: ChainTransaction,
}

impl TxBuilder {
    pub(crate) fn new(hash: B256, from: Address) -> Self {
        Self {
            tx: ChainTransaction {
                hash,
                from,
                gas_price: 5_000_000_000,
                has_input: true,
                logs: Vec::new(),
            },
        }
    }

    pub(crate) fn log(mut self, log: ChainLog) -> Self {
        self.tx.logs.push(log);
        self
    }

    pub(crate) fn without_input(mut self) -> Self {
        self.tx.has_input = false;
        self
    }

    pub(crate) fn build(self) -> ChainTransaction {
        self.tx
    }
}

use alloy_primitives::Address;
use indexer_core::types::{Pair, Token};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Pair/token lookup state shared by every block task
#[derive(Debug, Default)]
pub struct CacheState {
    pairs: HashMap<Address, Pair>,
    tokens: HashMap<Address, Token>,
    /// Pools, routers and other pass-through addresses
    swap_contracts: HashSet<Address>,
}

impl CacheState {
    pub fn pair(&self, address: &Address) -> Option<&Pair> {
        self.pairs.get(address)
    }

    pub fn token(&self, address: &Address) -> Option<&Token> {
        self.tokens.get(address)
    }

    /// Cache a pair; its address becomes a known swap contract
    pub fn insert_pair(&mut self, pair: Pair) {
        self.swap_contracts.insert(pair.address);
        self.pairs.insert(pair.address, pair);
    }

    pub fn insert_token(&mut self, token: Token) {
        self.tokens.insert(token.address, token);
    }

    /// Returns false when the token is not cached
    pub fn set_token_price(&mut self, address: &Address, price_usd: f64) -> bool {
        match self.tokens.get_mut(address) {
            Some(token) => {
                token.price_usd = price_usd;
                true
            }
            None => false,
        }
    }

    pub fn add_swap_contract(&mut self, address: Address) -> bool {
        self.swap_contracts.insert(address)
    }

    pub fn is_swap_contract(&self, address: &Address) -> bool {
        self.swap_contracts.contains(address)
    }

    pub fn swap_contracts(&self) -> &HashSet<Address> {
        &self.swap_contracts
    }
}

/// One mutex over the whole cache: readers refreshing an entry and writers
/// registering a block's pairs never interleave.
#[derive(Debug, Default)]
pub struct PairCache {
    inner: Mutex<CacheState>,
}

impl PairCache {
    /// Seed the swap contract set with configured routers and special addresses
    pub fn new(static_contracts: impl IntoIterator<Item = Address>) -> Self {
        let state = CacheState {
            swap_contracts: static_contracts.into_iter().collect(),
            ..Default::default()
        };
        Self {
            inner: Mutex::new(state),
        }
    }

    pub fn pair(&self, address: &Address) -> Option<Pair> {
        self.inner.lock().pair(address).cloned()
    }

    pub fn token(&self, address: &Address) -> Option<Token> {
        self.inner.lock().token(address).cloned()
    }

    pub fn insert_pair(&self, pair: Pair) {
        self.inner.lock().insert_pair(pair);
    }

    pub fn insert_token(&self, token: Token) {
        self.inner.lock().insert_token(token);
    }

    pub fn set_token_price(&self, address: &Address, price_usd: f64) -> bool {
        self.inner.lock().set_token_price(address, price_usd)
    }

    pub fn is_swap_contract(&self, address: &Address) -> bool {
        self.inner.lock().is_swap_contract(address)
    }

    pub fn pair_count(&self) -> usize {
        self.inner.lock().pairs.len()
    }

    /// Run `f` with the cache locked. Must not be held across an await point.
    pub fn with<R>(&self, f: impl FnOnce(&mut CacheState) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}

use alloy_primitives::{Address, U256};
use indexer_core::types::{HackType, Pair, ProtocolVariant, Token};
use indexer_core::{ChainClient, HackProbe, IndexerError, PairRepository, QuoteAssets, Result};
use indexer_store::PairCache;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::deadline::Deadlines;
use crate::valuation::{pair_name, quote_token};

/// Quote amount spent by a hack-check simulation (0.001 of the native coin)
const HACK_PROBE_AMOUNT: u64 = 1_000_000_000_000_000;

/// Resolves token and pair metadata: shared cache, then storage, then chain
pub struct MetadataResolver {
    client: Arc<dyn ChainClient>,
    pairs: Arc<dyn PairRepository>,
    cache: Arc<PairCache>,
    quotes: QuoteAssets,
    deadlines: Deadlines,
}

impl MetadataResolver {
    pub fn new(
        client: Arc<dyn ChainClient>,
        pairs: Arc<dyn PairRepository>,
        cache: Arc<PairCache>,
        quotes: QuoteAssets,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            client,
            pairs,
            cache,
            quotes,
            deadlines,
        }
    }

    pub fn quotes(&self) -> &QuoteAssets {
        &self.quotes
    }

    pub async fn token(&self, address: Address) -> Result<Token> {
        if let Some(token) = self.cache.token(&address) {
            return Ok(token);
        }

        let stored = self
            .deadlines
            .storage("load_token", self.pairs.token(address))
            .await?;
        let token = match stored {
            Some(token) => token,
            None => {
                let token = self.token_from_chain(address).await?;
                self.deadlines
                    .storage("save_token", self.pairs.save_token(&token))
                    .await?;
                token
            }
        };

        self.cache.insert_token(token.clone());
        Ok(token)
    }

    async fn token_from_chain(&self, address: Address) -> Result<Token> {
        let decimals = match self
            .deadlines
            .rpc("decimals", self.client.token_decimals(address))
            .await
        {
            Ok(decimals) => decimals,
            Err(e) => {
                warn!(token = ?address, error = %e, "Failed to read decimals, using 0");
                0
            }
        };

        let name = self
            .deadlines
            .rpc("name", self.client.token_name(address))
            .await
            .unwrap_or_default();

        let symbol = match self
            .deadlines
            .rpc("symbol", self.client.token_symbol(address))
            .await
        {
            Ok(symbol) if !symbol.is_empty() => symbol,
            _ if !name.is_empty() => name.clone(),
            _ => return Err(IndexerError::TokenNotFound(address)),
        };

        let total_supply = self
            .deadlines
            .rpc("totalSupply", self.client.token_total_supply(address))
            .await
            .map(|supply| supply.to_string())
            .unwrap_or_else(|_| "0".to_string());

        debug!(token = ?address, %symbol, decimals, "Token metadata read from chain");

        Ok(Token {
            address,
            symbol,
            name,
            decimals,
            price_usd: 0.0,
            total_supply,
        })
    }

    /// Cached pair, else the stored one, else discovered on-chain and saved
    pub async fn pair(&self, address: Address, hint: ProtocolVariant) -> Result<Pair> {
        if let Some(pair) = self.cache.pair(&address) {
            return Ok(pair);
        }
        self.fresh_pair(address, hint).await
    }

    /// Pair as currently stored, bypassing the cache
    pub async fn fresh_pair(&self, address: Address, hint: ProtocolVariant) -> Result<Pair> {
        let stored = self
            .deadlines
            .storage("load_pair", self.pairs.pair(address))
            .await?;
        match stored {
            Some(pair) => Ok(pair),
            None => self.discover(address, hint).await,
        }
    }

    async fn discover(&self, address: Address, hint: ProtocolVariant) -> Result<Pair> {
        let (token0, token1) = self
            .deadlines
            .rpc("token0_token1", self.client.pair_tokens(address))
            .await?;

        let probed = self
            .deadlines
            .rpc("pool_variant", self.client.pool_variant(address))
            .await
            .unwrap_or_default();
        let variant = match probed {
            ProtocolVariant::Unknown => hint,
            known => known,
        };

        let mut pair = Pair::new(address, token0, token1, variant);
        self.describe_pair(&mut pair).await;
        self.deadlines
            .storage("save_pair", self.pairs.save_pair(&pair))
            .await?;

        info!(pair = ?address, name = %pair.name, "Discovered pair from chain");
        indexer_metrics::counters::pairs_discovered(1);
        Ok(pair)
    }

    /// Fill decimals and display name. Unreadable token metadata leaves the
    /// pair at zero decimals and "Unknown/Unknown".
    pub async fn describe_pair(&self, pair: &mut Pair) {
        match (self.token(pair.token0).await, self.token(pair.token1).await) {
            (Ok(token0), Ok(token1)) => {
                let quote = quote_token(pair.token0, pair.token1, &self.quotes);
                pair.decimals0 = token0.decimals;
                pair.decimals1 = token1.decimals;
                pair.name = pair_name(&token0, &token1, &quote, pair.variant);
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(pair = ?pair.address, error = %e, "Token metadata unavailable, pair recorded as unknown");
                pair.decimals0 = 0;
                pair.decimals1 = 0;
                pair.name = "Unknown/Unknown".to_string();
            }
        }
    }

    /// Simulate a round trip through a V2 pair with a native-coin side
    pub async fn classify_hack(&self, pair: &Pair, checker: Address) -> HackType {
        if pair.variant != ProtocolVariant::V2 {
            return HackType::Unknown;
        }

        let (token_in, token_out) = if self.quotes.is_native(&pair.token0) {
            (pair.token0, pair.token1)
        } else if self.quotes.is_native(&pair.token1) {
            (pair.token1, pair.token0)
        } else {
            return HackType::Unknown;
        };

        let balance = self
            .deadlines
            .rpc("balanceOf", self.client.balance_of(token_out, pair.address))
            .await;
        match balance {
            Ok(balance) if !balance.is_zero() => {}
            _ => return HackType::EmptyBalance,
        }

        let probe = |div_factor: u64| HackProbe {
            checker,
            pair: pair.address,
            token_in,
            token_out,
            token0: pair.token0,
            amount: U256::from(HACK_PROBE_AMOUNT),
            div_factor: U256::from(div_factor),
        };

        let clean = self
            .deadlines
            .rpc("hackTestForUniV2", self.client.hack_probe(&probe(1)))
            .await;
        let hack_type = match clean {
            Ok(true) => HackType::Normal,
            Ok(false) => match self
                .deadlines
                .rpc("hackTestForUniV2", self.client.hack_probe(&probe(2)))
                .await
            {
                Ok(true) => HackType::Deflationary,
                Ok(false) => HackType::Scam,
                Err(_) => HackType::Unknown,
            },
            Err(e) => {
                warn!(pair = ?pair.address, error = %e, "Hack probe failed");
                HackType::Unknown
            }
        };

        debug!(pair = ?pair.address, ?hack_type, "Classified main token");
        hack_type
    }
}

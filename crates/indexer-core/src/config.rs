use crate::error::{IndexerError, Result};
use alloy_primitives::Address;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Blocks produced per day on the reference chain (~14.4s block time)
pub const BLOCKS_PER_DAY: i64 = 250 * 24;

/// Chain identity; selects the deployment file and the native price source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Eth,
    Bsc,
}

impl Chain {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Chain::Eth => "eth",
            Chain::Bsc => "bsc",
        }
    }
}

impl FromStr for Chain {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "eth" | "ethereum" | "1" => Ok(Chain::Eth),
            "bsc" | "bnb" | "56" => Ok(Chain::Bsc),
            other => Err(IndexerError::InvalidConfig(format!("unknown chain: {}", other))),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment configuration loaded from JSON file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    /// Stablecoins priced at 1 USD
    pub quote_usd_tokens: Vec<Address>,
    /// Wrapped native asset(s), priced at the oracle price
    pub quote_native_tokens: Vec<Address>,
    #[serde(default)]
    pub routers: Vec<Address>,
    /// Burn sinks and other addresses that never trade for themselves
    #[serde(default)]
    pub special_addresses: Vec<Address>,
    pub native_price_pool: Address,
    pub hack_check_contract: Option<Address>,
}

/// The designated value-reference assets of a chain
#[derive(Debug, Clone, Default)]
pub struct QuoteAssets {
    usd: HashSet<Address>,
    native: HashSet<Address>,
}

impl QuoteAssets {
    pub fn new(
        usd: impl IntoIterator<Item = Address>,
        native: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self {
            usd: usd.into_iter().collect(),
            native: native.into_iter().collect(),
        }
    }

    pub fn is_usd(&self, token: &Address) -> bool {
        self.usd.contains(token)
    }

    pub fn is_native(&self, token: &Address) -> bool {
        self.native.contains(token)
    }

    pub fn is_quote(&self, token: &Address) -> bool {
        self.is_usd(token) || self.is_native(token)
    }

    pub fn usd_tokens(&self) -> impl Iterator<Item = &Address> {
        self.usd.iter()
    }

    pub fn native_tokens(&self) -> impl Iterator<Item = &Address> {
        self.native.iter()
    }
}

/// Runtime configuration from environment variables
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub chain: Chain,
    pub rpc_url: String,
    pub ws_url: String,
    /// Archive-capable endpoint used for historical reads and as fallback
    pub archive_rpc_url: String,
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Backfill depth below the head; negative disables backfill
    pub retrieve_old_block_num: i64,
    /// Backfill refreshes the native price every k admitted blocks
    pub price_refresh_interval: u64,
    pub max_concurrent_blocks: usize,
    pub backfill_sleep_ms: u64,
    pub reconnect_delay_secs: u64,
    /// Price at block height instead of "now" for live blocks
    pub development_mode: bool,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let retrieve_old_block_num = env::var("RETRIEVE_OLD_BLOCK_NUM")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(BLOCKS_PER_DAY * 3);

        let price_refresh_interval = env::var("PRICE_REFRESH_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|k: &u64| *k > 0)
            .unwrap_or(20);

        let max_concurrent_blocks = env::var("MAX_CONCURRENT_BLOCKS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|c: &usize| *c > 0)
            .unwrap_or(10);

        let backfill_sleep_ms = env::var("BACKFILL_SLEEP_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        let reconnect_delay_secs = env::var("RECONNECT_DELAY_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let development_mode = env::var("DEVELOPMENT_MODE")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            retrieve_old_block_num,
            price_refresh_interval,
            max_concurrent_blocks,
            backfill_sleep_ms,
            reconnect_delay_secs,
            development_mode,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retrieve_old_block_num: BLOCKS_PER_DAY * 3,
            price_refresh_interval: 20,
            max_concurrent_blocks: 10,
            backfill_sleep_ms: 100,
            reconnect_delay_secs: 5,
            development_mode: false,
        }
    }
}

/// Block processing configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Receipts with more logs than this are exempt from trader attribution
    pub log_num_too_big_in_one_tx: usize,
    /// Swaps older than this do not touch candles or pair statistics
    pub max_swap_age_secs: u64,
    pub rpc_timeout_secs: u64,
    pub storage_timeout_secs: u64,
}

impl ProcessorConfig {
    pub fn from_env() -> Self {
        let log_num_too_big_in_one_tx = env::var("LOG_NUM_TOO_BIG_IN_ONE_TX")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        let rpc_timeout_secs = env::var("RPC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let storage_timeout_secs = env::var("STORAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Self {
            log_num_too_big_in_one_tx,
            max_swap_age_secs: 7 * 24 * 3600,
            rpc_timeout_secs,
            storage_timeout_secs,
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            log_num_too_big_in_one_tx: 100,
            max_swap_age_secs: 7 * 24 * 3600,
            rpc_timeout_secs: 5,
            storage_timeout_secs: 5,
        }
    }
}

/// Complete indexer configuration
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub chain: Chain,
    pub rpc_url: String,
    pub ws_url: String,
    pub archive_rpc_url: String,
    pub quotes: QuoteAssets,
    pub routers: Vec<Address>,
    pub special_addresses: Vec<Address>,
    pub native_price_pool: Address,
    pub hack_check_contract: Option<Address>,
    pub sync: SyncConfig,
    pub processor: ProcessorConfig,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let chain = env::var("CHAIN")
            .unwrap_or_else(|_| Chain::Eth.as_str().to_string())
            .parse::<Chain>()?;

        let rpc_url = sanitize_url(
            &env::var("RPC_URL").map_err(|_| IndexerError::MissingEnvVar("RPC_URL".to_string()))?,
        );

        let ws_url = sanitize_url(
            &env::var("WS_URL").map_err(|_| IndexerError::MissingEnvVar("WS_URL".to_string()))?,
        );

        let archive_rpc_url = env::var("ARCHIVE_RPC_URL")
            .map(|url| sanitize_url(&url))
            .unwrap_or_else(|_| rpc_url.clone());

        Ok(Self {
            chain,
            rpc_url,
            ws_url,
            archive_rpc_url,
        })
    }
}

/// Sanitize URL by removing surrounding quotes and whitespace
pub fn sanitize_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_quotes = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    without_quotes.to_string()
}

impl DeploymentConfig {
    /// Load deployment configuration from JSON file
    pub fn load(chain: Chain) -> Result<Self> {
        let path = Self::deployment_path(chain);
        let content = fs::read_to_string(&path)
            .map_err(|_| IndexerError::DeploymentFileNotFound(path.display().to_string()))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let deployment: Self = serde_json::from_str(content)
            .map_err(|e| IndexerError::DeploymentParseError(e.to_string()))?;

        if deployment.quote_usd_tokens.is_empty() && deployment.quote_native_tokens.is_empty() {
            return Err(IndexerError::DeploymentParseError(
                "no quote tokens configured".to_string(),
            ));
        }
        Ok(deployment)
    }

    fn deployment_path(chain: Chain) -> PathBuf {
        PathBuf::from(format!("deployments/{}.json", chain))
    }
}

impl IndexerConfig {
    /// Load complete configuration from environment and deployment file
    pub fn load() -> Result<Self> {
        let env_config = EnvConfig::load()?;
        let deployment = DeploymentConfig::load(env_config.chain)?;
        Ok(Self::from_parts(env_config, deployment))
    }

    pub fn from_parts(env_config: EnvConfig, deployment: DeploymentConfig) -> Self {
        Self {
            chain: env_config.chain,
            rpc_url: env_config.rpc_url,
            ws_url: env_config.ws_url,
            archive_rpc_url: env_config.archive_rpc_url,
            quotes: QuoteAssets::new(deployment.quote_usd_tokens, deployment.quote_native_tokens),
            routers: deployment.routers,
            special_addresses: deployment.special_addresses,
            native_price_pool: deployment.native_price_pool,
            hack_check_contract: deployment.hack_check_contract,
            sync: SyncConfig::from_env(),
            processor: ProcessorConfig::from_env(),
        }
    }

    /// Addresses that are pass-through hops rather than trade endpoints
    pub fn static_swap_contracts(&self) -> impl Iterator<Item = Address> + '_ {
        self.routers
            .iter()
            .chain(self.special_addresses.iter())
            .chain(self.quotes.usd_tokens())
            .chain(self.quotes.native_tokens())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ETH_DEPLOYMENT: &str = r#"{
        "quoteUsdTokens": ["0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"],
        "quoteNativeTokens": ["0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"],
        "routers": ["0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"],
        "specialAddresses": ["0x000000000000000000000000000000000000dEaD"],
        "nativePricePool": "0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640",
        "hackCheckContract": null
    }"#;

    #[test]
    fn test_sanitize_url() {
        assert_eq!(sanitize_url(" \"http://node:8545\" "), "http://node:8545");
        assert_eq!(sanitize_url("'ws://node:8546'"), "ws://node:8546");
        assert_eq!(sanitize_url("http://plain"), "http://plain");
        assert_eq!(sanitize_url("\""), "\"");
    }

    #[test]
    fn test_chain_parse() {
        assert_eq!("ETH".parse::<Chain>().unwrap(), Chain::Eth);
        assert_eq!("bsc".parse::<Chain>().unwrap(), Chain::Bsc);
        assert!("solana".parse::<Chain>().is_err());
    }

    #[test]
    fn test_deployment_parse() {
        let deployment = DeploymentConfig::from_json(ETH_DEPLOYMENT).unwrap();
        let quotes = QuoteAssets::new(
            deployment.quote_usd_tokens.clone(),
            deployment.quote_native_tokens.clone(),
        );

        let usdc = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        let weth = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
        assert!(quotes.is_usd(&usdc));
        assert!(quotes.is_native(&weth));
        assert!(!quotes.is_usd(&weth));
        assert_eq!(deployment.routers.len(), 1);
        assert!(deployment.hack_check_contract.is_none());
    }

    #[test]
    fn test_deployment_without_quotes_rejected() {
        let json = r#"{
            "quoteUsdTokens": [],
            "quoteNativeTokens": [],
            "nativePricePool": "0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640",
            "hackCheckContract": null
        }"#;
        assert!(matches!(
            DeploymentConfig::from_json(json),
            Err(IndexerError::DeploymentParseError(_))
        ));
    }
}

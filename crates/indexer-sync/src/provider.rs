use alloy::consensus::Transaction as ConsensusTransaction;
use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionResponse;
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::sol;
use alloy_primitives::{Address, FixedBytes, B256, U256};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indexer_core::types::{ChainBlock, ChainLog, ChainTransaction, ProtocolVariant};
use indexer_core::{ChainClient, HackProbe, IndexerError, Result};
use indexer_metrics::histograms;
use std::fmt::Display;
use std::future::IntoFuture;
use std::time::Instant;
use tracing::{debug, info};

use crate::scheduler::{HeadSource, HeadStream};

sol! {
    #[sol(rpc)]
    interface IERC20Metadata {
        function decimals() external view returns (uint8);
        function name() external view returns (string);
        function symbol() external view returns (string);
        function totalSupply() external view returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
    }

    /// Pre-standard tokens returning `bytes32` metadata
    #[sol(rpc)]
    interface IERC20Bytes32 {
        function name() external view returns (bytes32);
        function symbol() external view returns (bytes32);
    }

    #[sol(rpc)]
    interface IPoolProbe {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function kLast() external view returns (uint256);
        function maxLiquidityPerTick() external view returns (uint128);
    }

    #[sol(rpc)]
    interface IHackChecker {
        function hackTestForUniV2(
            address pair,
            address tokenFrom,
            address tokenTo,
            address token0,
            uint256 amount,
            uint256 divFactor
        ) external;
    }
}

/// Await an RPC call and record its latency under `method`
pub(crate) async fn timed<F, T, E>(method: &'static str, call: F) -> std::result::Result<T, E>
where
    F: IntoFuture<Output = std::result::Result<T, E>>,
{
    let start = Instant::now();
    let result = call.await;
    histograms::rpc_request_duration(start.elapsed(), method);
    result
}

pub(crate) fn rpc_error(e: impl Display) -> IndexerError {
    IndexerError::Rpc(e.to_string())
}

/// The node answered and the call itself failed (revert, missing method, no code)
fn is_revert(error: &alloy::contract::Error) -> bool {
    match error {
        alloy::contract::Error::TransportError(e) => e.is_error_resp(),
        alloy::contract::Error::ZeroData(..) | alloy::contract::Error::AbiError(_) => true,
        _ => false,
    }
}

fn bytes32_to_string(raw: FixedBytes<32>) -> String {
    let end = raw.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn parse_url(url: &str, kind: &str) -> Result<reqwest::Url> {
    url.parse()
        .map_err(|e| IndexerError::InvalidConfig(format!("Invalid {} URL: {}", kind, e)))
}

/// Manages the local and archive RPC providers and the head subscription endpoint
pub struct ProviderManager {
    local: DynProvider,
    archive: DynProvider,
    ws_url: String,
}

impl ProviderManager {
    pub async fn new(rpc_url: &str, archive_url: &str, ws_url: &str) -> Result<Self> {
        let local = ProviderBuilder::new()
            .connect_http(parse_url(rpc_url, "RPC")?)
            .erased();
        let archive = ProviderBuilder::new()
            .connect_http(parse_url(archive_url, "archive RPC")?)
            .erased();

        Ok(Self {
            local,
            archive,
            ws_url: ws_url.to_string(),
        })
    }

    /// Local node
    pub fn local(&self) -> &DynProvider {
        &self.local
    }

    /// Archive-capable node, used for historical reads and as fallback
    pub fn archive(&self) -> &DynProvider {
        &self.archive
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    async fn metadata_string(&self, token: Address, field: &'static str) -> Result<String> {
        let erc20 = IERC20Metadata::new(token, self.local.clone());
        let standard = match field {
            "name" => timed("name", erc20.name().call()).await,
            _ => timed("symbol", erc20.symbol().call()).await,
        };
        match standard {
            Ok(value) => Ok(value),
            Err(e) if is_revert(&e) => {
                debug!(token = ?token, field, "Falling back to bytes32 metadata");
                let legacy = IERC20Bytes32::new(token, self.local.clone());
                let raw = match field {
                    "name" => timed("name", legacy.name().call()).await,
                    _ => timed("symbol", legacy.symbol().call()).await,
                }
                .map_err(rpc_error)?;
                Ok(bytes32_to_string(raw))
            }
            Err(e) => Err(rpc_error(e)),
        }
    }
}

#[async_trait]
impl ChainClient for ProviderManager {
    async fn head_number(&self) -> Result<u64> {
        timed("eth_blockNumber", self.local.get_block_number())
            .await
            .map_err(rpc_error)
    }

    async fn block(&self, number: u64) -> Result<Option<ChainBlock>> {
        let block = timed(
            "eth_getBlockByNumber",
            self.local
                .get_block_by_number(BlockNumberOrTag::Number(number))
                .full(),
        )
        .await
        .map_err(rpc_error)?;

        let Some(block) = block else {
            return Ok(None);
        };

        let transactions = block
            .transactions
            .txns()
            .map(|tx| ChainTransaction {
                hash: TransactionResponse::tx_hash(tx),
                from: TransactionResponse::from(tx),
                gas_price: tx
                    .effective_gas_price
                    .unwrap_or_else(|| ConsensusTransaction::max_fee_per_gas(tx)),
                has_input: !ConsensusTransaction::input(tx).is_empty(),
                logs: Vec::new(),
            })
            .collect();

        Ok(Some(ChainBlock {
            number: block.header.inner.number,
            hash: block.header.hash,
            timestamp: block.header.inner.timestamp,
            transactions,
        }))
    }

    async fn receipt_logs(&self, tx_hash: B256) -> Result<Vec<ChainLog>> {
        let receipt = timed(
            "eth_getTransactionReceipt",
            self.local.get_transaction_receipt(tx_hash),
        )
        .await
        .map_err(rpc_error)?
        .ok_or_else(|| IndexerError::Rpc(format!("receipt not found: {}", tx_hash)))?;

        Ok(receipt
            .inner
            .logs()
            .iter()
            .map(|log| ChainLog {
                address: log.inner.address,
                data: log.inner.data.clone(),
                log_index: log.log_index.unwrap_or_default(),
            })
            .collect())
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        let erc20 = IERC20Metadata::new(token, self.local.clone());
        timed("decimals", erc20.decimals().call())
            .await
            .map_err(rpc_error)
    }

    async fn token_name(&self, token: Address) -> Result<String> {
        self.metadata_string(token, "name").await
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        self.metadata_string(token, "symbol").await
    }

    async fn token_total_supply(&self, token: Address) -> Result<U256> {
        let erc20 = IERC20Metadata::new(token, self.local.clone());
        timed("totalSupply", erc20.totalSupply().call())
            .await
            .map_err(rpc_error)
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        let erc20 = IERC20Metadata::new(token, self.local.clone());
        timed("balanceOf", erc20.balanceOf(owner).call())
            .await
            .map_err(rpc_error)
    }

    async fn pair_tokens(&self, pair: Address) -> Result<(Address, Address)> {
        let pool = IPoolProbe::new(pair, self.local.clone());
        let token0 = timed("token0", pool.token0().call()).await.map_err(rpc_error)?;
        let token1 = timed("token1", pool.token1().call()).await.map_err(rpc_error)?;
        Ok((token0, token1))
    }

    async fn pool_variant(&self, pair: Address) -> Result<ProtocolVariant> {
        let pool = IPoolProbe::new(pair, self.local.clone());

        match timed("kLast", pool.kLast().call()).await {
            Ok(_) => return Ok(ProtocolVariant::V2),
            Err(e) if is_revert(&e) => {}
            Err(e) => return Err(rpc_error(e)),
        }

        match timed("maxLiquidityPerTick", pool.maxLiquidityPerTick().call()).await {
            Ok(_) => Ok(ProtocolVariant::V3),
            Err(e) if is_revert(&e) => Ok(ProtocolVariant::Unknown),
            Err(e) => Err(rpc_error(e)),
        }
    }

    async fn hack_probe(&self, probe: &HackProbe) -> Result<bool> {
        let checker = IHackChecker::new(probe.checker, self.local.clone());
        let call = checker.hackTestForUniV2(
            probe.pair,
            probe.token_in,
            probe.token_out,
            probe.token0,
            probe.amount,
            probe.div_factor,
        );

        match timed("hackTestForUniV2", call.call()).await {
            Ok(_) => Ok(true),
            Err(e) if is_revert(&e) => Ok(false),
            Err(e) => Err(rpc_error(e)),
        }
    }
}

#[async_trait]
impl HeadSource for ProviderManager {
    async fn subscribe(&self) -> Result<HeadStream> {
        let provider = ProviderBuilder::new()
            .connect_ws(WsConnect::new(self.ws_url.clone()))
            .await
            .map_err(|e| IndexerError::WebSocket(e.to_string()))?
            .erased();

        let subscription = provider
            .subscribe_blocks()
            .await
            .map_err(|e| IndexerError::WebSocket(e.to_string()))?;
        info!("Subscribed to new block headers");

        // the provider owns the socket, so it travels with the stream
        let headers = Box::pin(subscription.into_stream());
        let heads = stream::unfold((provider, headers), |(provider, mut headers)| async move {
            let header = headers.next().await?;
            Some((Ok(header.inner.number), (provider, headers)))
        });

        Ok(Box::pin(heads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes32_to_string() {
        let mut raw = [0u8; 32];
        raw[..3].copy_from_slice(b"MKR");
        assert_eq!(bytes32_to_string(FixedBytes(raw)), "MKR");
        assert_eq!(bytes32_to_string(FixedBytes([0u8; 32])), "");
    }

    #[test]
    fn test_parse_url() {
        assert!(parse_url("http://localhost:8545", "RPC").is_ok());
        assert!(matches!(
            parse_url("not a url", "RPC"),
            Err(IndexerError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_manager_keeps_endpoints() {
        let manager = ProviderManager::new(
            "http://localhost:8545",
            "http://archive:8545",
            "ws://localhost:8546",
        )
        .await
        .unwrap();
        assert_eq!(manager.ws_url(), "ws://localhost:8546");
    }
}

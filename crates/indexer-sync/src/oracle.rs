//! Native asset fiat price read from an on-chain reference pool.

use alloy::eips::BlockId;
use alloy::providers::DynProvider;
use alloy::sol;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use indexer_core::{Chain, IndexerError, PriceOracle, Result};
use indexer_metrics::gauges;
use tracing::warn;

use crate::provider::{rpc_error, timed, ProviderManager};

sol! {
    #[sol(rpc)]
    interface IUniswapV3PoolState {
        function slot0() external view returns (
            uint160 sqrtPriceX96,
            int24 tick,
            uint16 observationIndex,
            uint16 observationCardinality,
            uint16 observationCardinalityNext,
            uint8 feeProtocol,
            bool unlocked
        );
    }

    #[sol(rpc)]
    interface IUniswapV2Reserves {
        function getReserves() external view returns (
            uint112 reserve0,
            uint112 reserve1,
            uint32 blockTimestampLast
        );
    }
}

const SCALE: u128 = 1_000_000_000_000_000_000;

/// USDC (6 decimals) per WETH (18 decimals) from a USDC/WETH pool's
/// `sqrtPriceX96`, truncated to cents: `1e12 * 2^192 / sqrtPriceX96^2`.
pub fn price_from_sqrt_x96(sqrt_price_x96: U256) -> Result<f64> {
    let squared = sqrt_price_x96
        .checked_mul(sqrt_price_x96)
        .filter(|squared| !squared.is_zero())
        .ok_or_else(|| IndexerError::Rpc(format!("unusable sqrtPriceX96: {}", sqrt_price_x96)))?;

    let cents: U256 = (U256::from(100_000_000_000_000u64) << 192) / squared;
    let cents: u64 = cents
        .try_into()
        .map_err(|_| IndexerError::Rpc(format!("price out of range: {}", cents)))?;
    Ok(cents as f64 / 100.0)
}

/// Quote reserve per native reserve of a pair whose sides share decimals
pub fn price_from_reserves(quote_reserve: u128, native_reserve: u128) -> Result<f64> {
    if native_reserve == 0 {
        return Err(IndexerError::Rpc("empty native reserve".to_string()));
    }
    let scaled = U256::from(quote_reserve) * U256::from(SCALE) / U256::from(native_reserve);
    let scaled: u128 = scaled
        .try_into()
        .map_err(|_| IndexerError::Rpc(format!("price out of range: {}", scaled)))?;
    Ok(scaled as f64 / SCALE as f64)
}

/// Reads the configured reference pool. Current prices come from the local
/// node with the archive node as fallback; historical prices need the archive.
pub struct NativePriceOracle {
    chain: Chain,
    pool: Address,
    local: DynProvider,
    archive: DynProvider,
}

impl NativePriceOracle {
    pub fn new(chain: Chain, pool: Address, providers: &ProviderManager) -> Self {
        Self {
            chain,
            pool,
            local: providers.local().clone(),
            archive: providers.archive().clone(),
        }
    }

    async fn query(&self, provider: &DynProvider, height: Option<u64>) -> Result<f64> {
        let block = height.map_or(BlockId::latest(), BlockId::number);
        match self.chain {
            Chain::Eth => {
                let pool = IUniswapV3PoolState::new(self.pool, provider.clone());
                let slot0 = timed("slot0", pool.slot0().block(block).call())
                    .await
                    .map_err(rpc_error)?;
                price_from_sqrt_x96(U256::from(slot0.sqrtPriceX96))
            }
            Chain::Bsc => {
                let pair = IUniswapV2Reserves::new(self.pool, provider.clone());
                let reserves = timed("getReserves", pair.getReserves().block(block).call())
                    .await
                    .map_err(rpc_error)?;
                price_from_reserves(reserves.reserve0.to::<u128>(), reserves.reserve1.to::<u128>())
            }
        }
    }
}

#[async_trait]
impl PriceOracle for NativePriceOracle {
    async fn native_price(&self, height: Option<u64>) -> Result<f64> {
        let price = match height {
            Some(_) => self.query(&self.archive, height).await?,
            None => match self.query(&self.local, None).await {
                Ok(price) => price,
                Err(e) => {
                    warn!(chain = %self.chain, error = %e, "Local price query failed, trying archive");
                    self.query(&self.archive, None).await?
                }
            },
        };
        gauges::set_native_price(price);
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_price_truncates_to_cents() {
        // 2^111 squared over 2^192 leaves 1e12 / 2^30 = 931.3225...
        let sqrt = U256::from(1u64) << 111;
        assert_eq!(price_from_sqrt_x96(sqrt).unwrap(), 931.32);
    }

    #[test]
    fn test_sqrt_price_near_mainnet() {
        // sqrt(5e8) * 2^96, roughly 2000 USDC per WETH
        let sqrt = U256::from(1_771_595_571_142_957_166_518_320_255_467_520u128);
        let price = price_from_sqrt_x96(sqrt).unwrap();
        assert!((price - 2000.0).abs() < 0.5, "price {}", price);
    }

    #[test]
    fn test_sqrt_price_rejects_zero_and_overflow() {
        assert!(price_from_sqrt_x96(U256::ZERO).is_err());
        assert!(price_from_sqrt_x96(U256::from(1u64) << 200).is_err());
    }

    #[test]
    fn test_price_from_reserves() {
        let price = price_from_reserves(300 * SCALE, SCALE).unwrap();
        assert_eq!(price, 300.0);
        assert_eq!(price_from_reserves(1, 3 * SCALE).unwrap(), 0.0);
        assert!(price_from_reserves(5, 0).is_err());
    }
}

use super::{hex, parse_address, parse_hash, parse_u128, to_i64, to_u64};
use crate::Result;
use indexer_core::types::{
    FirstLiquidity, HackType, Pair, PoolLiquidity, ProtocolVariant, TradeStats,
};
use sqlx::FromRow;

/// Row of `pairs`: metadata, first liquidity, pool value and rolling stats
#[derive(Debug, Clone, FromRow)]
pub struct DbPair {
    pub address: String,
    pub token0: String,
    pub token1: String,
    pub decimals0: i16,
    pub decimals1: i16,
    pub variant: i16,
    pub fee: i32,
    pub name: String,
    pub created_block: i64,
    pub created_tx: String,
    pub created_at: i64,
    pub first_add_block: Option<i64>,
    pub first_add_time: Option<i64>,
    pub first_add_tx: Option<String>,
    pub first_add_gas_price: Option<String>,
    pub liquidity_token0_usd: f64,
    pub liquidity_token1_usd: f64,
    pub liquidity_usd: f64,
    pub price: f64,
    pub price_usd: f64,
    pub tx_num_1h: i64,
    pub tx_num_24h: i64,
    pub tx_change_1h: f64,
    pub tx_change_24h: f64,
    pub volume_usd_1h: f64,
    pub volume_usd_24h: f64,
    pub volume_change_1h: f64,
    pub volume_change_24h: f64,
    pub price_change_1h: f64,
    pub price_change_24h: f64,
    pub stats_updated_at: i64,
    pub hack_type: i16,
}

impl From<&Pair> for DbPair {
    fn from(pair: &Pair) -> Self {
        let first = pair.first_liquidity.as_ref();
        Self {
            address: hex(&pair.address),
            token0: hex(&pair.token0),
            token1: hex(&pair.token1),
            decimals0: i16::from(pair.decimals0),
            decimals1: i16::from(pair.decimals1),
            variant: pair.variant.as_i16(),
            fee: i32::try_from(pair.fee).unwrap_or(i32::MAX),
            name: pair.name.clone(),
            created_block: to_i64(pair.created_block),
            created_tx: hex(&pair.created_tx),
            created_at: to_i64(pair.created_at),
            first_add_block: first.map(|f| to_i64(f.block_number)),
            first_add_time: first.map(|f| to_i64(f.timestamp)),
            first_add_tx: first.map(|f| hex(&f.tx_hash)),
            first_add_gas_price: first.map(|f| f.gas_price.to_string()),
            liquidity_token0_usd: pair.liquidity.token0_usd,
            liquidity_token1_usd: pair.liquidity.token1_usd,
            liquidity_usd: pair.liquidity.total_usd,
            price: pair.stats.price,
            price_usd: pair.stats.price_usd,
            tx_num_1h: to_i64(pair.stats.tx_num_1h),
            tx_num_24h: to_i64(pair.stats.tx_num_24h),
            tx_change_1h: pair.stats.tx_change_1h,
            tx_change_24h: pair.stats.tx_change_24h,
            volume_usd_1h: pair.stats.volume_usd_1h,
            volume_usd_24h: pair.stats.volume_usd_24h,
            volume_change_1h: pair.stats.volume_change_1h,
            volume_change_24h: pair.stats.volume_change_24h,
            price_change_1h: pair.stats.price_change_1h,
            price_change_24h: pair.stats.price_change_24h,
            stats_updated_at: to_i64(pair.stats.updated_at),
            hack_type: pair.hack_type.as_i16(),
        }
    }
}

impl DbPair {
    pub fn into_pair(self) -> Result<Pair> {
        let first_liquidity = match (
            self.first_add_block,
            self.first_add_time,
            self.first_add_tx.as_deref(),
        ) {
            (Some(block), Some(time), Some(tx)) => Some(FirstLiquidity {
                block_number: to_u64(block),
                timestamp: to_u64(time),
                tx_hash: parse_hash("first_add_tx", tx)?,
                gas_price: match self.first_add_gas_price.as_deref() {
                    Some(gas) => parse_u128("first_add_gas_price", gas)?,
                    None => 0,
                },
            }),
            _ => None,
        };

        Ok(Pair {
            address: parse_address("address", &self.address)?,
            token0: parse_address("token0", &self.token0)?,
            token1: parse_address("token1", &self.token1)?,
            decimals0: u8::try_from(self.decimals0).unwrap_or_default(),
            decimals1: u8::try_from(self.decimals1).unwrap_or_default(),
            variant: ProtocolVariant::from_i16(self.variant),
            fee: u32::try_from(self.fee).unwrap_or_default(),
            name: self.name,
            created_block: to_u64(self.created_block),
            created_tx: parse_hash("created_tx", &self.created_tx)?,
            created_at: to_u64(self.created_at),
            first_liquidity,
            liquidity: PoolLiquidity {
                token0_usd: self.liquidity_token0_usd,
                token1_usd: self.liquidity_token1_usd,
                total_usd: self.liquidity_usd,
            },
            stats: TradeStats {
                price: self.price,
                price_usd: self.price_usd,
                tx_num_1h: to_u64(self.tx_num_1h),
                tx_num_24h: to_u64(self.tx_num_24h),
                tx_change_1h: self.tx_change_1h,
                tx_change_24h: self.tx_change_24h,
                volume_usd_1h: self.volume_usd_1h,
                volume_usd_24h: self.volume_usd_24h,
                volume_change_1h: self.volume_change_1h,
                volume_change_24h: self.volume_change_24h,
                price_change_1h: self.price_change_1h,
                price_change_24h: self.price_change_24h,
                updated_at: to_u64(self.stats_updated_at),
            },
            hack_type: HackType::from_i16(self.hack_type),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};

    #[test]
    fn test_pair_row_keeps_first_liquidity_and_stats() {
        let mut pair = Pair::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
            ProtocolVariant::V3,
        );
        pair.fee = 500;
        pair.name = "PEPE/WETH_UniV3".to_string();
        pair.created_block = 19_000_000;
        pair.first_liquidity = Some(FirstLiquidity {
            block_number: 19_000_001,
            timestamp: 1_700_000_000,
            tx_hash: B256::repeat_byte(9),
            gas_price: 30_000_000_000,
        });
        pair.stats.tx_num_24h = 17;
        pair.stats.price_change_1h = -0.25;
        pair.hack_type = HackType::Deflationary;

        let row = DbPair::from(&pair);
        assert_eq!(row.variant, 3);
        assert_eq!(row.first_add_gas_price.as_deref(), Some("30000000000"));
        assert_eq!(row.into_pair().unwrap(), pair);
    }

    #[test]
    fn test_pair_row_without_first_liquidity() {
        let pair = Pair::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
            ProtocolVariant::V2,
        );
        let mut row = DbPair::from(&pair);
        assert!(row.first_add_block.is_none());

        // a half-written first liquidity reads as absent
        row.first_add_block = Some(5);
        assert!(row.into_pair().unwrap().first_liquidity.is_none());
    }
}

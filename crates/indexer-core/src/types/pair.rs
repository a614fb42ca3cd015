use alloy_primitives::{Address, B256};

/// Swap protocol family of a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProtocolVariant {
    #[default]
    Unknown,
    /// Constant-product pair (four unsigned swap amounts)
    V2,
    /// Concentrated-liquidity pool (two signed swap amounts)
    V3,
}

impl ProtocolVariant {
    pub const fn as_i16(&self) -> i16 {
        match self {
            ProtocolVariant::Unknown => 0,
            ProtocolVariant::V2 => 2,
            ProtocolVariant::V3 => 3,
        }
    }

    pub const fn from_i16(value: i16) -> Self {
        match value {
            2 => ProtocolVariant::V2,
            3 => ProtocolVariant::V3,
            _ => ProtocolVariant::Unknown,
        }
    }

    /// Suffix appended to pair display names
    pub const fn name_suffix(&self) -> &'static str {
        match self {
            ProtocolVariant::Unknown => "",
            ProtocolVariant::V2 => "_UniV2",
            ProtocolVariant::V3 => "_UniV3",
        }
    }
}

/// Behaviour classification of a pair's main token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HackType {
    #[default]
    Uninit,
    Unknown,
    Normal,
    /// Fee-on-transfer
    Deflationary,
    Scam,
    /// Pool holds no main token
    EmptyBalance,
}

impl HackType {
    pub const fn as_i16(&self) -> i16 {
        match self {
            HackType::Uninit => 0,
            HackType::Unknown => 1,
            HackType::Normal => 2,
            HackType::Deflationary => 3,
            HackType::Scam => 4,
            HackType::EmptyBalance => 5,
        }
    }

    pub const fn from_i16(value: i16) -> Self {
        match value {
            1 => HackType::Unknown,
            2 => HackType::Normal,
            3 => HackType::Deflationary,
            4 => HackType::Scam,
            5 => HackType::EmptyBalance,
            _ => HackType::Uninit,
        }
    }
}

/// Earliest liquidity addition seen on a pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstLiquidity {
    pub block_number: u64,
    pub timestamp: u64,
    pub tx_hash: B256,
    pub gas_price: u128,
}

/// Fiat valuation of the pool's token balances
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoolLiquidity {
    pub token0_usd: f64,
    pub token1_usd: f64,
    pub total_usd: f64,
}

/// Rolling trade statistics, always written as one unit
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TradeStats {
    pub price: f64,
    pub price_usd: f64,
    pub tx_num_1h: u64,
    pub tx_num_24h: u64,
    pub tx_change_1h: f64,
    pub tx_change_24h: f64,
    pub volume_usd_1h: f64,
    pub volume_usd_24h: f64,
    pub volume_change_1h: f64,
    pub volume_change_24h: f64,
    pub price_change_1h: f64,
    pub price_change_24h: f64,
    pub updated_at: u64,
}

/// An on-chain liquidity pool
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub address: Address,
    /// On-chain canonical order; never swapped
    pub token0: Address,
    pub token1: Address,
    pub decimals0: u8,
    pub decimals1: u8,
    pub variant: ProtocolVariant,
    pub fee: u32,
    /// `MAIN/QUOTE_UniV2` style display name
    pub name: String,
    pub created_block: u64,
    pub created_tx: B256,
    pub created_at: u64,
    pub first_liquidity: Option<FirstLiquidity>,
    pub liquidity: PoolLiquidity,
    pub stats: TradeStats,
    pub hack_type: HackType,
}

impl Pair {
    pub fn new(address: Address, token0: Address, token1: Address, variant: ProtocolVariant) -> Self {
        Self {
            address,
            token0,
            token1,
            decimals0: 0,
            decimals1: 0,
            variant,
            fee: 0,
            name: "Unknown/Unknown".to_string(),
            created_block: 0,
            created_tx: B256::ZERO,
            created_at: 0,
            first_liquidity: None,
            liquidity: PoolLiquidity::default(),
            stats: TradeStats::default(),
            hack_type: HackType::Uninit,
        }
    }

    pub fn decimals_of(&self, token: &Address) -> Option<u8> {
        if *token == self.token0 {
            Some(self.decimals0)
        } else if *token == self.token1 {
            Some(self.decimals1)
        } else {
            None
        }
    }

    pub fn other_token(&self, token: &Address) -> Address {
        if *token == self.token0 {
            self.token1
        } else {
            self.token0
        }
    }

    /// Record an add-liquidity event if it predates the known first one
    pub fn observe_first_add(&mut self, candidate: FirstLiquidity) -> bool {
        if self.created_block == 0 {
            return false;
        }
        match self.first_liquidity {
            Some(existing) if existing.block_number <= candidate.block_number => false,
            _ => {
                self.first_liquidity = Some(candidate);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Pair {
        let mut pair = Pair::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
            ProtocolVariant::V2,
        );
        pair.created_block = 100;
        pair
    }

    fn add(block: u64) -> FirstLiquidity {
        FirstLiquidity {
            block_number: block,
            timestamp: block * 12,
            tx_hash: B256::repeat_byte(block as u8),
            gas_price: 1,
        }
    }

    #[test]
    fn test_first_add_keeps_earliest() {
        let mut pair = pair();
        assert!(pair.observe_first_add(add(120)));
        assert!(!pair.observe_first_add(add(130)));
        assert!(pair.observe_first_add(add(110)));
        assert_eq!(pair.first_liquidity.unwrap().block_number, 110);
    }

    #[test]
    fn test_first_add_requires_creation_block() {
        let mut pair = pair();
        pair.created_block = 0;
        assert!(!pair.observe_first_add(add(120)));
        assert!(pair.first_liquidity.is_none());
    }

    #[test]
    fn test_variant_codes() {
        for variant in [ProtocolVariant::Unknown, ProtocolVariant::V2, ProtocolVariant::V3] {
            assert_eq!(ProtocolVariant::from_i16(variant.as_i16()), variant);
        }
        assert_eq!(HackType::from_i16(3), HackType::Deflationary);
        assert_eq!(HackType::from_i16(42), HackType::Uninit);
    }
}

use alloy_primitives::Address;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    /// Immutable once read successfully
    pub decimals: u8,
    pub price_usd: f64,
    /// Raw total supply as a decimal string
    pub total_supply: String,
}

impl Token {
    pub fn unknown(address: Address) -> Self {
        Self {
            address,
            symbol: "Unknown".to_string(),
            name: "Unknown".to_string(),
            decimals: 0,
            price_usd: 0.0,
            total_supply: "0".to_string(),
        }
    }
}

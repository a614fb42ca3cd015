use super::{hex, parse_address};
use crate::Result;
use indexer_core::types::Token;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct DbToken {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: i16,
    pub price_usd: f64,
    pub total_supply: String,
}

impl From<&Token> for DbToken {
    fn from(token: &Token) -> Self {
        Self {
            address: hex(&token.address),
            symbol: token.symbol.clone(),
            name: token.name.clone(),
            decimals: i16::from(token.decimals),
            price_usd: token.price_usd,
            total_supply: token.total_supply.clone(),
        }
    }
}

impl DbToken {
    pub fn into_token(self) -> Result<Token> {
        Ok(Token {
            address: parse_address("address", &self.address)?,
            symbol: self.symbol,
            name: self.name,
            decimals: u8::try_from(self.decimals).unwrap_or_default(),
            price_usd: self.price_usd,
            total_supply: self.total_supply,
        })
    }
}

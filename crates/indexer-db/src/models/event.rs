use super::{hex, to_i64};
use indexer_core::types::{LiquidityEvent, Swap, Transfer};

/// Row of `swaps`; raw amounts are decimal strings
#[derive(Debug, Clone)]
pub struct DbSwap {
    pub id: String,
    pub tx_hash: String,
    pub log_index: i64,
    pub pair: String,
    pub block_number: i64,
    pub block_time: i64,
    pub variant: i16,
    pub token0: String,
    pub token1: String,
    pub amount0_in: String,
    pub amount1_in: String,
    pub amount0_out: String,
    pub amount1_out: String,
    pub main_token: String,
    pub main_amount: f64,
    pub price: f64,
    pub price_usd: f64,
    pub volume_usd: f64,
    pub direction: i16,
    pub sender: String,
    pub recipient: String,
    pub operator: String,
    pub trader: Option<String>,
    pub gas_price: String,
}

impl From<&Swap> for DbSwap {
    fn from(swap: &Swap) -> Self {
        Self {
            id: swap.key.id(),
            tx_hash: hex(&swap.key.tx_hash),
            log_index: to_i64(swap.key.log_index),
            pair: hex(&swap.pair),
            block_number: to_i64(swap.block_number),
            block_time: to_i64(swap.block_time),
            variant: swap.variant.as_i16(),
            token0: hex(&swap.token0),
            token1: hex(&swap.token1),
            amount0_in: swap.amount0_in.to_string(),
            amount1_in: swap.amount1_in.to_string(),
            amount0_out: swap.amount0_out.to_string(),
            amount1_out: swap.amount1_out.to_string(),
            main_token: hex(&swap.main_token),
            main_amount: swap.main_amount,
            price: swap.price,
            price_usd: swap.price_usd,
            volume_usd: swap.volume_usd,
            direction: swap.direction.as_i16(),
            sender: hex(&swap.sender),
            recipient: hex(&swap.recipient),
            operator: hex(&swap.operator),
            trader: swap.trader.as_ref().map(hex),
            gas_price: swap.gas_price.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbTransfer {
    pub id: String,
    pub tx_hash: String,
    pub log_index: i64,
    pub token: String,
    pub from_address: String,
    pub to_address: String,
    pub raw_amount: String,
    pub amount: f64,
    pub value_usd: f64,
    pub kind: i16,
    pub block_number: i64,
    pub block_time: i64,
    pub operator: String,
}

impl From<&Transfer> for DbTransfer {
    fn from(transfer: &Transfer) -> Self {
        Self {
            id: transfer.key.id(),
            tx_hash: hex(&transfer.key.tx_hash),
            log_index: to_i64(transfer.key.log_index),
            token: hex(&transfer.token),
            from_address: hex(&transfer.from),
            to_address: hex(&transfer.to),
            raw_amount: transfer.raw_amount.to_string(),
            amount: transfer.amount,
            value_usd: transfer.value_usd,
            kind: transfer.kind.as_i16(),
            block_number: to_i64(transfer.block_number),
            block_time: to_i64(transfer.block_time),
            operator: hex(&transfer.operator),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbLiquidityEvent {
    pub id: String,
    pub tx_hash: String,
    pub log_index: i64,
    pub pair: String,
    pub variant: i16,
    pub direction: i16,
    pub token0: String,
    pub token1: String,
    pub amount0: String,
    pub amount1: String,
    pub value_usd: f64,
    pub operator: String,
    pub block_number: i64,
    pub block_time: i64,
    pub gas_price: String,
}

impl From<&LiquidityEvent> for DbLiquidityEvent {
    fn from(event: &LiquidityEvent) -> Self {
        Self {
            id: event.key.id(),
            tx_hash: hex(&event.key.tx_hash),
            log_index: to_i64(event.key.log_index),
            pair: hex(&event.pair),
            variant: event.variant.as_i16(),
            direction: event.direction.as_i16(),
            token0: hex(&event.token0),
            token1: hex(&event.token1),
            amount0: event.amount0.to_string(),
            amount1: event.amount1.to_string(),
            value_usd: event.value_usd,
            operator: hex(&event.operator),
            block_number: to_i64(event.block_number),
            block_time: to_i64(event.block_time),
            gas_price: event.gas_price.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, U256};
    use indexer_core::types::{Direction, EventKey, ProtocolVariant};

    #[test]
    fn test_swap_row_id_matches_event_key() {
        let swap = Swap {
            key: EventKey::new(B256::repeat_byte(0xaa), 4),
            pair: Address::repeat_byte(1),
            block_number: 100,
            block_time: 1_700_000_000,
            variant: ProtocolVariant::V2,
            token0: Address::repeat_byte(2),
            token1: Address::repeat_byte(3),
            amount0_in: U256::from(10u64).pow(U256::from(30)),
            amount1_in: U256::ZERO,
            amount0_out: U256::ZERO,
            amount1_out: U256::from(5u64),
            main_token: Address::repeat_byte(3),
            main_amount: 5.0,
            price: 2.0,
            price_usd: 2.0,
            volume_usd: 10.0,
            direction: Direction::BuyOrAdd,
            sender: Address::repeat_byte(4),
            recipient: Address::repeat_byte(5),
            operator: Address::repeat_byte(6),
            trader: None,
            gas_price: 1,
        };

        let row = DbSwap::from(&swap);
        assert_eq!(row.id, format!("{}_4", row.tx_hash));
        assert_eq!(row.amount0_in, format!("1{}", "0".repeat(30)));
        assert_eq!(row.direction, 1);
        assert!(row.trader.is_none());
    }
}

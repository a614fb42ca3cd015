use alloy_primitives::{Address, U256};
use alloy_sol_types::SolEvent;
use indexer_core::events::{uniswap_v2, uniswap_v3};
use indexer_core::types::{ChainLog, Direction, ProtocolVariant};

use super::DecodedEvent;

/// Mint or burn on a pool. The operator is the transaction signer, not a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityLog {
    pub pair: Address,
    pub variant: ProtocolVariant,
    pub direction: Direction,
    pub amount0: U256,
    pub amount1: U256,
}

fn liquidity(
    log: &ChainLog,
    variant: ProtocolVariant,
    direction: Direction,
    amount0: U256,
    amount1: U256,
) -> DecodedEvent {
    DecodedEvent::Liquidity(LiquidityLog {
        pair: log.address,
        variant,
        direction,
        amount0,
        amount1,
    })
}

pub(super) fn decode_v2_mint(log: &ChainLog) -> Option<DecodedEvent> {
    let event = uniswap_v2::Mint::decode_log_data(&log.data).ok()?;
    Some(liquidity(log, ProtocolVariant::V2, Direction::BuyOrAdd, event.amount0, event.amount1))
}

pub(super) fn decode_v2_burn(log: &ChainLog) -> Option<DecodedEvent> {
    let event = uniswap_v2::Burn::decode_log_data(&log.data).ok()?;
    Some(liquidity(
        log,
        ProtocolVariant::V2,
        Direction::SellOrRemove,
        event.amount0,
        event.amount1,
    ))
}

pub(super) fn decode_v3_mint(log: &ChainLog) -> Option<DecodedEvent> {
    let event = uniswap_v3::Mint::decode_log_data(&log.data).ok()?;
    Some(liquidity(log, ProtocolVariant::V3, Direction::BuyOrAdd, event.amount0, event.amount1))
}

pub(super) fn decode_v3_burn(log: &ChainLog) -> Option<DecodedEvent> {
    let event = uniswap_v3::Burn::decode_log_data(&log.data).ok()?;
    Some(liquidity(
        log,
        ProtocolVariant::V3,
        Direction::SellOrRemove,
        event.amount0,
        event.amount1,
    ))
}

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolEvent;
use indexer_core::events::erc20;
use indexer_core::types::ChainLog;

use super::DecodedEvent;

/// ERC-20 movement of `value` raw units of `token`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLog {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

pub(super) fn decode(log: &ChainLog) -> Option<DecodedEvent> {
    let event = erc20::Transfer::decode_log_data(&log.data).ok()?;
    Some(DecodedEvent::Transfer(TransferLog {
        token: log.address,
        from: event.from,
        to: event.to,
        value: event.value,
    }))
}

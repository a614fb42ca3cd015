//! Log decoding: topic-0 and topic-count dispatch into typed events.
//!
//! A log that matches no known layout, or whose payload fails to decode,
//! comes back as [`DecodedEvent::Unrecognized`] and never aborts the block.

mod liquidity;
mod pair_created;
mod swap;
mod transfer;

pub use liquidity::LiquidityLog;
pub use pair_created::PairCreatedLog;
pub use swap::{SwapAmounts, SwapLog, SwapPricing};
pub use transfer::TransferLog;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolEvent;
use indexer_core::events::{erc20, uniswap_v2, uniswap_v3};
use indexer_core::types::ChainLog;

/// One log, resolved to the event shape it carries
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    PairCreated(PairCreatedLog),
    Swap(SwapLog),
    Liquidity(LiquidityLog),
    Transfer(TransferLog),
    Unrecognized(UnrecognizedLog),
}

/// Raw remains of a log no decoder accepted
#[derive(Debug, Clone, PartialEq)]
pub struct UnrecognizedLog {
    pub address: Address,
    pub topic0: Option<B256>,
    pub topic_count: usize,
    pub data: Bytes,
}

impl DecodedEvent {
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, DecodedEvent::Unrecognized(_))
    }
}

pub fn decode_log(log: &ChainLog) -> DecodedEvent {
    let topics = log.data.topics();
    let data_len = log.data.data.len();

    let decoded = match topics.first() {
        Some(&topic0) => match (topic0, topics.len()) {
            (t, 3) if t == uniswap_v2::PairCreated::SIGNATURE_HASH => pair_created::decode_v2(log),
            (t, 4) if t == uniswap_v3::PoolCreated::SIGNATURE_HASH => pair_created::decode_v3(log),
            (t, 3) if t == uniswap_v2::Swap::SIGNATURE_HASH => swap::decode_v2(log),
            (t, 3) if t == uniswap_v3::Swap::SIGNATURE_HASH => swap::decode_v3(log),
            (t, 2) if t == uniswap_v2::Mint::SIGNATURE_HASH && data_len == 64 => {
                liquidity::decode_v2_mint(log)
            }
            (t, 3) if t == uniswap_v2::Burn::SIGNATURE_HASH && data_len == 64 => {
                liquidity::decode_v2_burn(log)
            }
            (t, 4) if t == uniswap_v3::Mint::SIGNATURE_HASH && data_len == 128 => {
                liquidity::decode_v3_mint(log)
            }
            (t, 4) if t == uniswap_v3::Burn::SIGNATURE_HASH && data_len == 96 => {
                liquidity::decode_v3_burn(log)
            }
            (t, 3) if t == erc20::Transfer::SIGNATURE_HASH => transfer::decode(log),
            _ => None,
        },
        None => None,
    };

    decoded.unwrap_or_else(|| {
        DecodedEvent::Unrecognized(UnrecognizedLog {
            address: log.address,
            topic0: topics.first().copied(),
            topic_count: topics.len(),
            data: log.data.data.clone(),
        })
    })
}

use alloy_primitives::Address;
use alloy_sol_types::SolEvent;
use indexer_core::events::{uniswap_v2, uniswap_v3};
use indexer_core::types::{ChainLog, ProtocolVariant};

use super::DecodedEvent;

/// A factory announcing a new pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairCreatedLog {
    pub pair: Address,
    pub token0: Address,
    pub token1: Address,
    pub variant: ProtocolVariant,
    /// Fee tier in hundredths of a basis point
    pub fee: u32,
}

pub(super) fn decode_v2(log: &ChainLog) -> Option<DecodedEvent> {
    let event = uniswap_v2::PairCreated::decode_log_data(&log.data).ok()?;
    Some(DecodedEvent::PairCreated(PairCreatedLog {
        pair: event.pair,
        token0: event.token0,
        token1: event.token1,
        variant: ProtocolVariant::V2,
        fee: uniswap_v2::V2_FEE,
    }))
}

pub(super) fn decode_v3(log: &ChainLog) -> Option<DecodedEvent> {
    let event = uniswap_v3::PoolCreated::decode_log_data(&log.data).ok()?;
    Some(DecodedEvent::PairCreated(PairCreatedLog {
        pair: event.pool,
        token0: event.token0,
        token1: event.token1,
        variant: ProtocolVariant::V3,
        fee: event.fee.to::<u32>(),
    }))
}

#[cfg(test)]
mod tests {
    use super::super::decode_log;
    use super::super::tests::chain_log;
    use super::*;
    use alloy_primitives::aliases::{I24, U24};
    use alloy_primitives::U256;

    #[test]
    fn test_decode_v2_pair_created() {
        let event = uniswap_v2::PairCreated {
            token0: Address::repeat_byte(1),
            token1: Address::repeat_byte(2),
            pair: Address::repeat_byte(3),
            allPairsLength: U256::from(400_000u64),
        };
        let log = chain_log(Address::repeat_byte(0xfa), event.encode_log_data(), 0);

        assert_eq!(
            decode_log(&log),
            DecodedEvent::PairCreated(PairCreatedLog {
                pair: Address::repeat_byte(3),
                token0: Address::repeat_byte(1),
                token1: Address::repeat_byte(2),
                variant: ProtocolVariant::V2,
                fee: 3000,
            })
        );
    }

    #[test]
    fn test_decode_v3_pool_created() {
        let event = uniswap_v3::PoolCreated {
            token0: Address::repeat_byte(1),
            token1: Address::repeat_byte(2),
            fee: U24::from(500u32),
            tickSpacing: I24::try_from(10).unwrap(),
            pool: Address::repeat_byte(4),
        };
        let log = chain_log(Address::repeat_byte(0xfb), event.encode_log_data(), 0);

        match decode_log(&log) {
            DecodedEvent::PairCreated(created) => {
                assert_eq!(created.pair, Address::repeat_byte(4));
                assert_eq!(created.variant, ProtocolVariant::V3);
                assert_eq!(created.fee, 500);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

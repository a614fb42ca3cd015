use alloy_primitives::{Address, I256, U256};
use alloy_sol_types::SolEvent;
use indexer_core::events::{uniswap_v2, uniswap_v3};
use indexer_core::types::{ChainLog, Direction, ProtocolVariant};

use super::DecodedEvent;
use crate::math::{scaled_amount, scaled_price};

/// Raw amounts of a swap, in the layout of its protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapAmounts {
    /// Unsigned amounts entering and leaving the pair
    V2 {
        amount0_in: U256,
        amount1_in: U256,
        amount0_out: U256,
        amount1_out: U256,
    },
    /// Signed balance deltas of the pool: positive entered, negative left
    V3 { amount0: I256, amount1: I256 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapLog {
    pub pair: Address,
    pub variant: ProtocolVariant,
    pub sender: Address,
    pub recipient: Address,
    pub amounts: SwapAmounts,
}

/// Main-token view of a swap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapPricing {
    pub main_amount: f64,
    /// Main token price in quote token units
    pub price: f64,
    pub direction: Direction,
}

/// Which raw amounts are the main and quote legs, and which way the main token moved
struct Legs {
    main_raw: U256,
    quote_raw: U256,
    direction: Direction,
}

impl SwapAmounts {
    /// `(amount0_in, amount1_in, amount0_out, amount1_out)`
    pub fn in_out(&self) -> (U256, U256, U256, U256) {
        match *self {
            SwapAmounts::V2 {
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
            } => (amount0_in, amount1_in, amount0_out, amount1_out),
            SwapAmounts::V3 { amount0, amount1 } => {
                let (a0_in, a0_out) = split_signed(amount0);
                let (a1_in, a1_out) = split_signed(amount1);
                (a0_in, a1_in, a0_out, a1_out)
            }
        }
    }

    fn legs(&self, main_is_token0: bool) -> Option<Legs> {
        match *self {
            SwapAmounts::V2 {
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
            } => v2_legs(amount0_in, amount1_in, amount0_out, amount1_out, main_is_token0),
            SwapAmounts::V3 { amount0, amount1 } => v3_legs(amount0, amount1, main_is_token0),
        }
    }

    /// Main amount, price and direction; `None` for shapes that are not a
    /// plain one-way trade or when the fixed-point math cannot be carried out
    pub fn price(&self, main_is_token0: bool, decimals0: u8, decimals1: u8) -> Option<SwapPricing> {
        let legs = self.legs(main_is_token0)?;
        let (main_decimals, quote_decimals) = if main_is_token0 {
            (decimals0, decimals1)
        } else {
            (decimals1, decimals0)
        };

        Some(SwapPricing {
            main_amount: scaled_amount(legs.main_raw, main_decimals)?,
            price: scaled_price(legs.quote_raw, quote_decimals, legs.main_raw, main_decimals)?,
            direction: legs.direction,
        })
    }
}

fn split_signed(amount: I256) -> (U256, U256) {
    if amount.is_negative() {
        (U256::ZERO, amount.unsigned_abs())
    } else {
        (amount.into_raw(), U256::ZERO)
    }
}

fn v2_legs(a0_in: U256, a1_in: U256, a0_out: U256, a1_out: U256, main_is_token0: bool) -> Option<Legs> {
    // token1 in, token0 out
    if (a0_in.is_zero() || a1_out.is_zero()) && !a1_in.is_zero() && !a0_out.is_zero() {
        return Some(if main_is_token0 {
            Legs {
                main_raw: a0_out,
                quote_raw: a1_in,
                direction: Direction::BuyOrAdd,
            }
        } else {
            Legs {
                main_raw: a1_in,
                quote_raw: a0_out,
                direction: Direction::SellOrRemove,
            }
        });
    }

    // token0 in, token1 out
    if (a1_in.is_zero() || a0_out.is_zero()) && !a0_in.is_zero() && !a1_out.is_zero() {
        return Some(if main_is_token0 {
            Legs {
                main_raw: a0_in,
                quote_raw: a1_out,
                direction: Direction::SellOrRemove,
            }
        } else {
            Legs {
                main_raw: a1_out,
                quote_raw: a0_in,
                direction: Direction::BuyOrAdd,
            }
        });
    }

    None
}

fn v3_legs(amount0: I256, amount1: I256, main_is_token0: bool) -> Option<Legs> {
    let token0_in = amount0.is_positive() && amount1.is_negative();
    let token1_in = amount0.is_negative() && amount1.is_positive();
    if !token0_in && !token1_in {
        return None;
    }

    let (abs0, abs1) = (amount0.unsigned_abs(), amount1.unsigned_abs());
    let legs = match (main_is_token0, token0_in) {
        // main token paid into the pool: a sell
        (true, true) => Legs {
            main_raw: abs0,
            quote_raw: abs1,
            direction: Direction::SellOrRemove,
        },
        (true, false) => Legs {
            main_raw: abs0,
            quote_raw: abs1,
            direction: Direction::BuyOrAdd,
        },
        (false, true) => Legs {
            main_raw: abs1,
            quote_raw: abs0,
            direction: Direction::BuyOrAdd,
        },
        (false, false) => Legs {
            main_raw: abs1,
            quote_raw: abs0,
            direction: Direction::SellOrRemove,
        },
    };
    Some(legs)
}

pub(super) fn decode_v2(log: &ChainLog) -> Option<DecodedEvent> {
    let event = uniswap_v2::Swap::decode_log_data(&log.data).ok()?;
    Some(DecodedEvent::Swap(SwapLog {
        pair: log.address,
        variant: ProtocolVariant::V2,
        sender: event.sender,
        recipient: event.to,
        amounts: SwapAmounts::V2 {
            amount0_in: event.amount0In,
            amount1_in: event.amount1In,
            amount0_out: event.amount0Out,
            amount1_out: event.amount1Out,
        },
    }))
}

pub(super) fn decode_v3(log: &ChainLog) -> Option<DecodedEvent> {
    let event = uniswap_v3::Swap::decode_log_data(&log.data).ok()?;
    Some(DecodedEvent::Swap(SwapLog {
        pair: log.address,
        variant: ProtocolVariant::V3,
        sender: event.sender,
        recipient: event.recipient,
        amounts: SwapAmounts::V3 {
            amount0: event.amount0,
            amount1: event.amount1,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::super::decode_log;
    use super::super::tests::chain_log;
    use super::*;
    use alloy_primitives::aliases::{I24, U160};

    fn assert_close(actual: f64, expected: f64) {
        assert!(((actual - expected) / expected).abs() <= 1e-9, "{actual} != {expected}");
    }

    fn v2(a0_in: u128, a1_in: u128, a0_out: u128, a1_out: u128) -> SwapAmounts {
        SwapAmounts::V2 {
            amount0_in: U256::from(a0_in),
            amount1_in: U256::from(a1_in),
            amount0_out: U256::from(a0_out),
            amount1_out: U256::from(a1_out),
        }
    }

    #[test]
    fn test_v2_buy_main_token1() {
        // 100 USDC (token0, 6) in, 0.05 WETH (token1, 18) out
        let pricing = v2(100_000_000, 0, 0, 50_000_000_000_000_000)
            .price(false, 6, 18)
            .unwrap();
        assert_eq!(pricing.direction, Direction::BuyOrAdd);
        assert_close(pricing.price, 2000.0);
        assert_close(pricing.main_amount, 0.05);
    }

    #[test]
    fn test_v2_sell_main_token0() {
        // 1000 TOKEN (token0, 9) in, 2 WETH (token1, 18) out
        let pricing = v2(1_000_000_000_000, 0, 0, 2_000_000_000_000_000_000)
            .price(true, 9, 18)
            .unwrap();
        assert_eq!(pricing.direction, Direction::SellOrRemove);
        assert_close(pricing.price, 0.002);
        assert_close(pricing.main_amount, 1000.0);
    }

    #[test]
    fn test_v2_both_sides_in_is_not_priced() {
        assert!(v2(5, 5, 5, 5).price(true, 18, 18).is_none());
        assert!(v2(0, 0, 0, 0).price(true, 18, 18).is_none());
    }

    #[test]
    fn test_v3_sign_rules() {
        // pool received 2000 USDC (token0), paid 1 WETH (token1): WETH bought
        let amounts = SwapAmounts::V3 {
            amount0: I256::try_from(2_000_000_000i64).unwrap(),
            amount1: I256::try_from(-1_000_000_000_000_000_000i128).unwrap(),
        };
        let pricing = amounts.price(false, 6, 18).unwrap();
        assert_eq!(pricing.direction, Direction::BuyOrAdd);
        assert_close(pricing.price, 2000.0);
        assert_close(pricing.main_amount, 1.0);

        // same deltas with token0 as the main token: token0 was sold
        let pricing = amounts.price(true, 6, 18).unwrap();
        assert_eq!(pricing.direction, Direction::SellOrRemove);
        assert_close(pricing.main_amount, 2000.0);

        let (a0_in, a1_in, a0_out, a1_out) = amounts.in_out();
        assert_eq!(a0_in, U256::from(2_000_000_000u64));
        assert_eq!(a1_in, U256::ZERO);
        assert_eq!(a0_out, U256::ZERO);
        assert_eq!(a1_out, U256::from(1_000_000_000_000_000_000u128));
    }

    #[test]
    fn test_v3_same_sign_is_not_priced() {
        let amounts = SwapAmounts::V3 {
            amount0: I256::try_from(5).unwrap(),
            amount1: I256::try_from(5).unwrap(),
        };
        assert!(amounts.price(true, 18, 18).is_none());
    }

    #[test]
    fn test_decode_v2_and_v3_swaps() {
        let pair = Address::repeat_byte(0x42);
        let v2_event = uniswap_v2::Swap {
            sender: Address::repeat_byte(1),
            amount0In: U256::from(10u64),
            amount1In: U256::ZERO,
            amount0Out: U256::ZERO,
            amount1Out: U256::from(20u64),
            to: Address::repeat_byte(2),
        };
        match decode_log(&chain_log(pair, v2_event.encode_log_data(), 5)) {
            DecodedEvent::Swap(swap) => {
                assert_eq!(swap.pair, pair);
                assert_eq!(swap.variant, ProtocolVariant::V2);
                assert_eq!(swap.sender, Address::repeat_byte(1));
                assert_eq!(swap.recipient, Address::repeat_byte(2));
            }
            other => panic!("unexpected {other:?}"),
        }

        let v3_event = uniswap_v3::Swap {
            sender: Address::repeat_byte(1),
            recipient: Address::repeat_byte(3),
            amount0: I256::try_from(-10).unwrap(),
            amount1: I256::try_from(20).unwrap(),
            sqrtPriceX96: U160::from(1u64) << 96,
            liquidity: 1_000_000u128,
            tick: I24::try_from(0).unwrap(),
        };
        match decode_log(&chain_log(pair, v3_event.encode_log_data(), 6)) {
            DecodedEvent::Swap(swap) => {
                assert_eq!(swap.variant, ProtocolVariant::V3);
                assert_eq!(swap.recipient, Address::repeat_byte(3));
                assert_eq!(
                    swap.amounts,
                    SwapAmounts::V3 {
                        amount0: I256::try_from(-10).unwrap(),
                        amount1: I256::try_from(20).unwrap(),
                    }
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

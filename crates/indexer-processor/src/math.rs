//! Fixed-point arithmetic for prices and amounts.
//!
//! Token decimals range from 0 to beyond 30, so every ratio is formed in
//! 512-bit integers scaled by 1e18 and only converted to `f64` at the end.

use alloy_primitives::{U256, U512};

/// Scale applied before integer division
const SCALE: u64 = 1_000_000_000_000_000_000;
const SCALE_F64: f64 = 1e18;

fn widen(value: U256) -> U512 {
    U512::from_be_slice(&value.to_be_bytes::<32>())
}

/// `10^exp`, or `None` past 512 bits
pub fn pow10(exp: u32) -> Option<U512> {
    U512::from(10u64).checked_pow(U512::from(exp))
}

fn pow10_u256(exp: u32) -> Option<U256> {
    U256::from(10u64).checked_pow(U256::from(exp))
}

/// Price of one whole main token in whole quote tokens:
/// `quote * 10^main_dec * 1e18 / 10^quote_dec / main`, then `/ 1e18` as a float.
pub fn scaled_price(quote_raw: U256, quote_decimals: u8, main_raw: U256, main_decimals: u8) -> Option<f64> {
    if main_raw.is_zero() {
        return None;
    }

    let numerator = widen(quote_raw)
        .checked_mul(pow10(main_decimals as u32)?)?
        .checked_mul(U512::from(SCALE))?;
    let price = numerator / pow10(quote_decimals as u32)? / widen(main_raw);

    Some(f64::from(&price) / SCALE_F64)
}

/// Whole-token amount: `raw * 1e18 / 10^decimals`, then `/ 1e18` as a float
pub fn scaled_amount(raw: U256, decimals: u8) -> Option<f64> {
    let scaled = widen(raw).checked_mul(U512::from(SCALE))? / pow10(decimals as u32)?;
    Some(f64::from(&scaled) / SCALE_F64)
}

/// Decimal-adjusted transfer amount.
///
/// Up to 9 decimals the raw value fits the float mantissa well enough. Beyond
/// that the raw value is first divided down to 9 decimals in integers, so
/// anything below 1e-9 of a token reads as zero.
pub fn transfer_amount(raw: U256, decimals: u8) -> f64 {
    if decimals <= 9 {
        return f64::from(&raw) / 10f64.powi(decimals as i32);
    }

    match pow10_u256(decimals as u32 - 9) {
        Some(divisor) => f64::from(&(raw / divisor)) / 1e9,
        None => 0.0,
    }
}

//! Fiat valuation against the configured quote assets.

use alloy_primitives::{Address, B256, U256};
use indexer_core::types::{Pair, PoolLiquidity, ProtocolVariant, Swap, Token, Transfer, TransferKind};
use indexer_core::QuoteAssets;
use std::collections::{HashMap, HashSet};

use crate::math::transfer_amount;

/// Quote side of a pair: USD coins win over native coins, token1 over token0,
/// and token1 when neither side is a quote asset.
pub fn quote_token(token0: Address, token1: Address, quotes: &QuoteAssets) -> Address {
    if quotes.is_usd(&token1) {
        token1
    } else if quotes.is_usd(&token0) {
        token0
    } else if quotes.is_native(&token1) {
        token1
    } else if quotes.is_native(&token0) {
        token0
    } else {
        token1
    }
}

pub fn main_token(token0: Address, token1: Address, quotes: &QuoteAssets) -> Address {
    if quote_token(token0, token1, quotes) == token0 {
        token1
    } else {
        token0
    }
}

/// Fiat value of one whole unit of `token`, when it is a quote asset
pub fn unit_usd(token: &Address, quotes: &QuoteAssets, native_price: f64) -> f64 {
    if quotes.is_usd(token) {
        1.0
    } else if quotes.is_native(token) {
        native_price
    } else {
        0.0
    }
}

pub fn side_usd(token: &Address, raw: U256, decimals: u8, quotes: &QuoteAssets, native_price: f64) -> f64 {
    let base = unit_usd(token, quotes, native_price);
    if base == 0.0 {
        return 0.0;
    }
    transfer_amount(raw, decimals) * base
}

/// Fiat price of the main token, from its price in quote units
pub fn swap_price_usd(price: f64, quote: &Address, quotes: &QuoteAssets, native_price: f64) -> f64 {
    price * unit_usd(quote, quotes, native_price)
}

/// Fiat value of a mint or burn. A V2 event with one unvalued side but two
/// nonzero amounts counts the valued side twice.
pub fn liquidity_event_usd(
    pair: &Pair,
    amount0: U256,
    amount1: U256,
    quotes: &QuoteAssets,
    native_price: f64,
) -> f64 {
    let usd0 = side_usd(&pair.token0, amount0, pair.decimals0, quotes, native_price);
    let usd1 = side_usd(&pair.token1, amount1, pair.decimals1, quotes, native_price);

    let total = usd0 + usd1;
    let one_side_unvalued = usd0 == 0.0 || usd1 == 0.0;
    if pair.variant == ProtocolVariant::V2
        && one_side_unvalued
        && !amount0.is_zero()
        && !amount1.is_zero()
    {
        total * 2.0
    } else {
        total
    }
}

/// Value both pool balances. When exactly one side has no fiat value and the
/// pair has a price, that side is derived from the other through the price.
pub fn pool_liquidity(
    pair: &Pair,
    balance0: U256,
    balance1: U256,
    quotes: &QuoteAssets,
    native_price: f64,
) -> PoolLiquidity {
    let mut token0_usd = side_usd(&pair.token0, balance0, pair.decimals0, quotes, native_price);
    let mut token1_usd = side_usd(&pair.token1, balance1, pair.decimals1, quotes, native_price);
    let price = pair.stats.price;

    if (token0_usd == 0.0) != (token1_usd == 0.0) && price > 0.0 {
        if token1_usd == 0.0 {
            token1_usd = transfer_amount(balance1, pair.decimals1)
                * price
                * unit_usd(&pair.token0, quotes, native_price);
        } else {
            token0_usd = transfer_amount(balance0, pair.decimals0)
                * price
                * unit_usd(&pair.token1, quotes, native_price);
        }
    }

    PoolLiquidity {
        token0_usd,
        token1_usd,
        total_usd: token0_usd + token1_usd,
    }
}

/// `MAIN/QUOTE` plus the protocol suffix; token order follows the quote side
pub fn pair_name(token0: &Token, token1: &Token, quote: &Address, variant: ProtocolVariant) -> String {
    let (main, quote) = if *quote == token0.address {
        (token1, token0)
    } else {
        (token0, token1)
    };
    format!("{}/{}{}", main.symbol, quote.symbol, variant.name_suffix())
}

/// Second pass over a block's transfers once its swaps are priced.
///
/// A token traded in the block is valued at its last swap price in the block;
/// any other token at `stored_price`. Transfers sharing a transaction with a
/// swap are swap legs.
pub fn classify_transfers(
    transfers: &mut [Transfer],
    swaps: &[Swap],
    stored_price: impl Fn(&Address) -> f64,
) {
    let mut block_prices: HashMap<Address, f64> = HashMap::new();
    let mut swap_txs: HashSet<B256> = HashSet::new();
    for swap in swaps {
        block_prices.insert(swap.main_token, swap.price_usd);
        swap_txs.insert(swap.key.tx_hash);
    }

    for transfer in transfers.iter_mut() {
        let price = match block_prices.get(&transfer.token) {
            Some(&price) if price > 0.0 => price,
            _ => stored_price(&transfer.token),
        };
        transfer.value_usd = transfer.amount * price;
        transfer.kind = if swap_txs.contains(&transfer.key.tx_hash) {
            TransferKind::Swap
        } else {
            TransferKind::Transfer
        };
    }
}

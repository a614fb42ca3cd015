use crate::interval::KlinePeriod;
use alloy_primitives::Address;
use indexer_core::types::Swap;
use serde::{Deserialize, Serialize};

/// One OHLCV candle. `unix_time == 0` means the slot was never written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kline {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Main token volume
    pub volume: f64,
    pub volume_usd: f64,
    pub tx_num: u64,
    pub price_usd: f64,
    /// Time of the latest trade in the candle (or the synthesized period time)
    pub unix_time: u64,
}

impl Kline {
    pub fn is_untouched(&self) -> bool {
        self.unix_time == 0
    }

    /// Fold one trade into the candle
    pub fn apply(&mut self, trade: &KlineTrade) {
        self.close = trade.price;
        self.price_usd = trade.price_usd;

        if self.is_untouched() {
            self.open = trade.price;
            self.high = trade.price;
            self.low = trade.price;
        } else {
            self.high = self.high.max(trade.price);
            self.low = self.low.min(trade.price);
        }

        self.unix_time = trade.timestamp;
        self.volume += trade.main_amount;
        self.tx_num += 1;
        self.volume_usd += trade.volume_usd;
    }

    /// Empty period following `previous`: flat at its close, no volume
    pub fn carried_from(previous: &Kline, slot_secs: u64) -> Self {
        Self {
            open: previous.close,
            high: previous.close,
            low: previous.close,
            close: previous.close,
            price_usd: previous.price_usd,
            unix_time: previous.unix_time + slot_secs,
            ..Default::default()
        }
    }

    /// Padding candle for periods before any known trade
    pub fn flat(price: f64, price_usd: f64) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
            price_usd,
            ..Default::default()
        }
    }
}

/// Trade data for candle aggregation
#[derive(Debug, Clone)]
pub struct KlineTrade {
    pub pair: Address,
    pub main_token: Address,
    pub quote_token: Address,
    pub timestamp: u64,
    pub price: f64,
    pub price_usd: f64,
    pub main_amount: f64,
    pub volume_usd: f64,
}

impl From<&Swap> for KlineTrade {
    fn from(swap: &Swap) -> Self {
        Self {
            pair: swap.pair,
            main_token: swap.main_token,
            quote_token: swap.quote_token(),
            timestamp: swap.block_time,
            price: swap.price,
            price_usd: swap.price_usd,
            main_amount: swap.main_amount,
            volume_usd: swap.volume_usd,
        }
    }
}

/// Fixed-size candle array for one (pair, coarse period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineBucket {
    pub key: String,
    pub pair: Address,
    pub base_token: Address,
    pub quote_token: Address,
    /// Reference time: the first trade written since the last reset
    pub timestamp: u64,
    pub slots: Vec<Kline>,
}

impl KlineBucket {
    /// Create an empty bucket for the period containing a trade
    pub fn new(period: KlinePeriod, trade: &KlineTrade) -> Self {
        Self {
            key: period.bucket_key(&trade.pair, trade.timestamp),
            pair: trade.pair,
            base_token: trade.main_token,
            quote_token: trade.quote_token,
            timestamp: trade.timestamp,
            slots: vec![Kline::default(); period.slots()],
        }
    }

    /// A bucket whose reference time is more than one span away from
    /// `timestamp` belongs to an earlier period that shares its key
    pub fn is_stale(&self, period: KlinePeriod, timestamp: u64) -> bool {
        timestamp.abs_diff(self.timestamp) > period.bucket_secs()
    }

    /// Wipe all candles and restart the bucket at `timestamp`
    pub fn reset(&mut self, period: KlinePeriod, timestamp: u64) {
        self.timestamp = timestamp;
        self.slots = vec![Kline::default(); period.slots()];
    }

    /// Write a trade, rolling the bucket over first when it is stale
    pub fn apply(&mut self, period: KlinePeriod, trade: &KlineTrade) {
        if self.is_stale(period, trade.timestamp) {
            self.reset(period, trade.timestamp);
        }
        if self.slots.len() != period.slots() {
            self.slots.resize(period.slots(), Kline::default());
        }

        let index = period.slot_index(trade.timestamp);
        self.slots[index].apply(trade);
    }

    pub fn touched(&self) -> usize {
        self.slots.iter().filter(|k| !k.is_untouched()).count()
    }
}

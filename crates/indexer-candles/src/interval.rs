use alloy_primitives::Address;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Kline granularity. Candles are stored in fixed-size arrays, one array per
/// coarser bucket: 60 minute candles per hour, 24 hour candles per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlinePeriod {
    Minute,
    Hour,
}

impl KlinePeriod {
    /// Duration of one candle in seconds
    pub const fn slot_secs(&self) -> u64 {
        match self {
            KlinePeriod::Minute => 60,
            KlinePeriod::Hour => 3600,
        }
    }

    /// Candles per bucket
    pub const fn slots(&self) -> usize {
        match self {
            KlinePeriod::Minute => 60,
            KlinePeriod::Hour => 24,
        }
    }

    /// Duration covered by one bucket in seconds
    pub const fn bucket_secs(&self) -> u64 {
        self.slot_secs() * self.slots() as u64
    }

    /// Get table name for database
    pub const fn table_name(&self) -> &'static str {
        match self {
            KlinePeriod::Minute => "kline_1min",
            KlinePeriod::Hour => "kline_1hour",
        }
    }

    /// How long buckets are kept by the storage layer
    pub const fn retention_secs(&self) -> u64 {
        match self {
            KlinePeriod::Minute => 21 * 86400,
            KlinePeriod::Hour => 180 * 86400,
        }
    }

    pub const fn suffix(&self) -> &'static str {
        match self {
            KlinePeriod::Minute => "1m",
            KlinePeriod::Hour => "1h",
        }
    }

    pub const fn all() -> &'static [KlinePeriod] {
        &[KlinePeriod::Minute, KlinePeriod::Hour]
    }

    /// Storage key of the bucket holding `timestamp`.
    ///
    /// Minute buckets are keyed by day-of-month and hour, hour buckets by month
    /// and day. Keys recur after a month (or a year); a recurring key is told
    /// apart by the bucket's reference timestamp.
    pub fn bucket_key(&self, pair: &Address, timestamp: u64) -> String {
        let time = to_datetime(timestamp);
        match self {
            KlinePeriod::Minute => format!("{:?}_{}_{}", pair, time.day(), time.hour()),
            KlinePeriod::Hour => format!("{:?}_{}_{}", pair, time.month(), time.day()),
        }
    }

    /// Index of the candle within its bucket
    pub fn slot_index(&self, timestamp: u64) -> usize {
        let time = to_datetime(timestamp);
        match self {
            KlinePeriod::Minute => time.minute() as usize,
            KlinePeriod::Hour => time.hour() as usize,
        }
    }

    /// Start of the candle containing `timestamp`
    pub fn slot_start(&self, timestamp: u64) -> u64 {
        timestamp - timestamp % self.slot_secs()
    }

    /// Start of the bucket containing `timestamp`
    pub fn bucket_start(&self, timestamp: u64) -> u64 {
        timestamp - timestamp % self.bucket_secs()
    }
}

impl std::fmt::Display for KlinePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

fn to_datetime(timestamp: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_default()
}

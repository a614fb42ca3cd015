use crate::bucket::{Kline, KlineBucket, KlineTrade};
use crate::interval::KlinePeriod;
use crate::store::KlineStore;
use crate::Result;
use alloy_primitives::Address;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Candle aggregation engine.
///
/// Writes go through one lock per period table (minute, hour) so that a
/// read-modify-write of a bucket never interleaves with another writer of
/// the same table.
pub struct KlineEngine {
    store: Arc<dyn KlineStore>,
    minute_lock: Mutex<()>,
    hour_lock: Mutex<()>,
}

impl KlineEngine {
    pub fn new(store: Arc<dyn KlineStore>) -> Self {
        Self {
            store,
            minute_lock: Mutex::new(()),
            hour_lock: Mutex::new(()),
        }
    }

    fn lock(&self, period: KlinePeriod) -> &Mutex<()> {
        match period {
            KlinePeriod::Minute => &self.minute_lock,
            KlinePeriod::Hour => &self.hour_lock,
        }
    }

    /// Fold a trade into the minute and hour candles.
    /// Returns false when the trade is rejected for having no price.
    pub async fn update(&self, trade: &KlineTrade) -> Result<bool> {
        if trade.price == 0.0 {
            warn!(
                pair = ?trade.pair,
                timestamp = trade.timestamp,
                "Rejecting trade with zero price for klines"
            );
            return Ok(false);
        }

        for period in KlinePeriod::all() {
            self.update_period(*period, trade).await?;
        }

        debug!(
            pair = ?trade.pair,
            price = trade.price,
            amount = trade.main_amount,
            "Processed trade for klines"
        );
        Ok(true)
    }

    async fn update_period(&self, period: KlinePeriod, trade: &KlineTrade) -> Result<()> {
        let _guard = self.lock(period).lock().await;

        let key = period.bucket_key(&trade.pair, trade.timestamp);
        let mut bucket = match self.store.load_bucket(period, &key).await? {
            Some(bucket) => bucket,
            None => KlineBucket::new(period, trade),
        };

        bucket.apply(period, trade);
        self.store.save_bucket(period, &bucket).await
    }

    /// The last `count` candles of `pair` ending with the candle containing
    /// `end`, with no gaps.
    ///
    /// Empty periods after the first trade carry the previous close forward.
    /// When history is shorter than `count`, the series is left-padded with
    /// flat candles at the first known open. Returns an empty series when the
    /// window holds no trade at all.
    pub async fn range(
        &self,
        pair: Address,
        period: KlinePeriod,
        end: u64,
        count: usize,
    ) -> Result<Vec<Kline>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let end = period.slot_start(end);
        let bucket_count = count.div_ceil(period.slots()) as u64;
        let start = end.saturating_sub(bucket_count * period.bucket_secs());

        let stored = self
            .store
            .buckets_in_range(
                period,
                pair,
                period.bucket_start(start),
                end + period.slot_secs(),
            )
            .await?;

        // One array per bucket in time order; missing buckets read as empty
        let buckets: Vec<Vec<Kline>> = (0..=bucket_count)
            .map(|i| {
                let key = period.bucket_key(&pair, start + i * period.bucket_secs());
                stored
                    .iter()
                    .find(|b| b.key == key)
                    .map(|b| b.slots.clone())
                    .unwrap_or_else(|| vec![Kline::default(); period.slots()])
            })
            .collect();

        let cutoff = end + period.slot_secs() - 1;
        let mut series = fill_gaps(buckets.into_iter().flatten(), period.slot_secs(), cutoff);
        fit_length(&mut series, count);
        Ok(series)
    }
}

/// Skip until the first written candle, then carry forward over empty ones,
/// stopping past `cutoff`
fn fill_gaps(klines: impl Iterator<Item = Kline>, slot_secs: u64, cutoff: u64) -> Vec<Kline> {
    let mut series: Vec<Kline> = Vec::new();

    for kline in klines {
        let kline = match series.last() {
            None if kline.is_untouched() => continue,
            None => kline,
            Some(last) if kline.open == 0.0 => Kline::carried_from(last, slot_secs),
            Some(_) => kline,
        };

        if kline.unix_time > cutoff {
            break;
        }
        series.push(kline);
    }

    series
}

fn fit_length(series: &mut Vec<Kline>, count: usize) {
    if series.len() >= count {
        series.drain(..series.len() - count);
        return;
    }

    if let Some(first) = series.first().copied() {
        let pad = count - series.len();
        let mut padded = vec![Kline::flat(first.open, first.price_usd); pad];
        padded.append(series);
        *series = padded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct TestStore {
        buckets: SyncMutex<HashMap<(KlinePeriod, String), KlineBucket>>,
    }

    #[async_trait]
    impl KlineStore for TestStore {
        async fn load_bucket(&self, period: KlinePeriod, key: &str) -> Result<Option<KlineBucket>> {
            Ok(self.buckets.lock().get(&(period, key.to_string())).cloned())
        }

        async fn save_bucket(&self, period: KlinePeriod, bucket: &KlineBucket) -> Result<()> {
            self.buckets
                .lock()
                .insert((period, bucket.key.clone()), bucket.clone());
            Ok(())
        }

        async fn buckets_in_range(
            &self,
            period: KlinePeriod,
            pair: Address,
            start: u64,
            end: u64,
        ) -> Result<Vec<KlineBucket>> {
            Ok(self
                .buckets
                .lock()
                .iter()
                .filter(|((p, _), b)| {
                    *p == period && b.pair == pair && b.timestamp >= start && b.timestamp < end
                })
                .map(|(_, b)| b.clone())
                .collect())
        }
    }

    // 2024-01-05 10:00:00 UTC
    const T10: u64 = 1_704_448_800;
    const MIN: u64 = 60;
    const HOUR: u64 = 3600;

    fn pair() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn trade(timestamp: u64, price: f64) -> KlineTrade {
        KlineTrade {
            pair: pair(),
            main_token: Address::repeat_byte(0xbb),
            quote_token: Address::repeat_byte(0xcc),
            timestamp,
            price,
            price_usd: price * 3000.0,
            main_amount: 1.0,
            volume_usd: price * 3000.0,
        }
    }

    fn engine() -> (KlineEngine, Arc<TestStore>) {
        let store = Arc::new(TestStore::default());
        (KlineEngine::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_zero_price_rejected() {
        let (engine, store) = engine();
        assert!(!engine.update(&trade(T10, 0.0)).await.unwrap());
        assert!(store.buckets.lock().is_empty());
    }

    #[tokio::test]
    async fn test_update_writes_both_periods() {
        let (engine, store) = engine();
        assert!(engine.update(&trade(T10 + 5 * MIN, 1.0)).await.unwrap());

        let buckets = store.buckets.lock();
        assert_eq!(buckets.len(), 2);
        let minute = buckets
            .iter()
            .find(|((p, _), _)| *p == KlinePeriod::Minute)
            .map(|(_, b)| b.clone())
            .unwrap();
        assert_eq!(minute.slots[5].tx_num, 1);
        assert_eq!(minute.base_token, Address::repeat_byte(0xbb));
    }

    #[tokio::test]
    async fn test_range_carries_forward_over_gaps() {
        let (engine, _) = engine();
        engine.update(&trade(T10 + 5 * MIN, 1.0)).await.unwrap();
        engine.update(&trade(T10 + 8 * MIN, 2.0)).await.unwrap();

        let series = engine
            .range(pair(), KlinePeriod::Minute, T10 + 10 * MIN + 30, 6)
            .await
            .unwrap();

        assert_eq!(series.len(), 6);
        let closes: Vec<f64> = series.iter().map(|k| k.close).collect();
        assert_eq!(closes, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        let times: Vec<u64> = series.iter().map(|k| k.unix_time).collect();
        assert_eq!(
            times,
            (5..=10).map(|m| T10 + m * MIN).collect::<Vec<_>>()
        );
        assert_eq!(series[1].tx_num, 0);
        assert_eq!(series[1].open, 1.0);
        assert_eq!(series[3].tx_num, 1);
    }

    #[tokio::test]
    async fn test_range_left_pads_with_flat_candles() {
        let (engine, _) = engine();
        // k = 4 real candles ending at the last minute of the window
        let end = T10 + 30 * MIN;
        for (i, price) in [3.0, 4.0, 5.0, 6.0].iter().enumerate() {
            engine
                .update(&trade(end - (3 - i as u64) * MIN, *price))
                .await
                .unwrap();
        }

        let n = 120;
        let series = engine.range(pair(), KlinePeriod::Minute, end, n).await.unwrap();

        assert_eq!(series.len(), n);
        for kline in &series[..n - 4] {
            assert_eq!(kline.open, 3.0);
            assert_eq!(kline.high, 3.0);
            assert_eq!(kline.low, 3.0);
            assert_eq!(kline.close, 3.0);
            assert_eq!(kline.price_usd, 9000.0);
            assert_eq!(kline.tx_num, 0);
        }
        let tail: Vec<f64> = series[n - 4..].iter().map(|k| k.close).collect();
        assert_eq!(tail, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[tokio::test]
    async fn test_range_keeps_trailing_candles() {
        let (engine, _) = engine();
        for m in 0..50 {
            engine
                .update(&trade(T10 + m * MIN, 1.0 + m as f64))
                .await
                .unwrap();
        }

        let series = engine
            .range(pair(), KlinePeriod::Minute, T10 + 49 * MIN, 10)
            .await
            .unwrap();
        assert_eq!(series.len(), 10);
        assert_eq!(series[0].close, 41.0);
        assert_eq!(series[9].close, 50.0);
    }

    #[tokio::test]
    async fn test_range_spans_previous_bucket() {
        let (engine, _) = engine();
        engine.update(&trade(T10 - 2 * MIN, 1.0)).await.unwrap();
        engine.update(&trade(T10 + MIN, 2.0)).await.unwrap();

        let series = engine
            .range(pair(), KlinePeriod::Minute, T10 + 2 * MIN, 5)
            .await
            .unwrap();
        let closes: Vec<f64> = series.iter().map(|k| k.close).collect();
        assert_eq!(closes, vec![1.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[tokio::test]
    async fn test_range_hour_period() {
        let (engine, _) = engine();
        let day2 = T10 - 10 * HOUR + 86400; // 2024-01-06 00:00
        engine.update(&trade(day2 - 2 * HOUR, 1.0)).await.unwrap();
        engine.update(&trade(day2 + HOUR + 1800, 2.0)).await.unwrap();

        let series = engine
            .range(pair(), KlinePeriod::Hour, day2 + 3 * HOUR + 900, 48)
            .await
            .unwrap();

        assert_eq!(series.len(), 48);
        let tail: Vec<f64> = series[42..].iter().map(|k| k.close).collect();
        assert_eq!(tail, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        assert!(series[..42].iter().all(|k| k.close == 1.0 && k.unix_time == 0));
    }

    #[tokio::test]
    async fn test_range_without_trades_is_empty() {
        let (engine, _) = engine();
        let series = engine
            .range(pair(), KlinePeriod::Minute, T10, 120)
            .await
            .unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_rollover_drops_previous_month() {
        let (engine, _) = engine();
        // Same day-of-month/hour key one month earlier
        engine
            .update(&trade(T10 - 31 * 86400 + 20 * MIN, 9.0))
            .await
            .unwrap();
        engine.update(&trade(T10 + 2 * MIN, 1.0)).await.unwrap();

        let series = engine
            .range(pair(), KlinePeriod::Minute, T10 + 30 * MIN, 30)
            .await
            .unwrap();
        assert_eq!(series.len(), 30);
        assert!(series.iter().all(|k| k.close == 1.0));
    }
}

use alloy_primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use indexer_candles::{KlineBucket, KlinePeriod, KlineStore, Result};

/// In-memory candle buckets, keyed by (period, bucket key)
#[derive(Debug, Default)]
pub struct KlineBucketStore {
    buckets: DashMap<(KlinePeriod, String), KlineBucket>,
}

impl KlineBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.buckets.len()
    }

    /// Drop buckets whose reference time is older than the period retention
    pub fn prune(&self, now: u64) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|(period, _), bucket| bucket.timestamp + period.retention_secs() >= now);
        before - self.buckets.len()
    }
}

#[async_trait]
impl KlineStore for KlineBucketStore {
    async fn load_bucket(&self, period: KlinePeriod, key: &str) -> Result<Option<KlineBucket>> {
        Ok(self
            .buckets
            .get(&(period, key.to_string()))
            .map(|b| b.clone()))
    }

    async fn save_bucket(&self, period: KlinePeriod, bucket: &KlineBucket) -> Result<()> {
        self.buckets
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
        let mut buckets: Vec<KlineBucket> = self
            .buckets
            .iter()
            .filter(|e| {
                let bucket = e.value();
                e.key().0 == period
                    && bucket.pair == pair
                    && bucket.timestamp >= start
                    && bucket.timestamp < end
            })
            .map(|e| e.value().clone())
            .collect();
        buckets.sort_by_key(|b| b.timestamp);
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexer_candles::KlineTrade;

    fn trade(timestamp: u64) -> KlineTrade {
        KlineTrade {
            pair: Address::repeat_byte(1),
            main_token: Address::repeat_byte(2),
            quote_token: Address::repeat_byte(3),
            timestamp,
            price: 1.0,
            price_usd: 1.0,
            main_amount: 1.0,
            volume_usd: 1.0,
        }
    }

    #[tokio::test]
    async fn test_range_filters_by_period_pair_and_time() {
        let store = KlineBucketStore::new();
        for (period, ts) in [
            (KlinePeriod::Minute, 1_000_000),
            (KlinePeriod::Minute, 1_003_600),
            (KlinePeriod::Hour, 1_000_000),
        ] {
            let bucket = KlineBucket::new(period, &trade(ts));
            store.save_bucket(period, &bucket).await.unwrap();
        }

        let found = store
            .buckets_in_range(KlinePeriod::Minute, Address::repeat_byte(1), 999_000, 1_003_600)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].timestamp, 1_000_000);

        let other_pair = store
            .buckets_in_range(KlinePeriod::Minute, Address::repeat_byte(9), 0, u64::MAX)
            .await
            .unwrap();
        assert!(other_pair.is_empty());
    }

    #[test]
    fn test_prune_by_retention() {
        let store = KlineBucketStore::new();
        let old = KlineBucket::new(KlinePeriod::Minute, &trade(1_000_000));
        store.buckets.insert((KlinePeriod::Minute, old.key.clone()), old);
        let now = 1_000_000 + KlinePeriod::Minute.retention_secs() + 1;
        assert_eq!(store.prune(now), 1);
        assert_eq!(store.count(), 0);
    }
}

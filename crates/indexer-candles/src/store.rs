use crate::bucket::KlineBucket;
use crate::interval::KlinePeriod;
use crate::Result;
use alloy_primitives::Address;
use async_trait::async_trait;

/// Persistence of candle buckets, unique on (period, key)
#[async_trait]
pub trait KlineStore: Send + Sync {
    async fn load_bucket(&self, period: KlinePeriod, key: &str) -> Result<Option<KlineBucket>>;

    /// Upsert by key
    async fn save_bucket(&self, period: KlinePeriod, bucket: &KlineBucket) -> Result<()>;

    /// Buckets of `pair` whose reference timestamp lies in `[start, end)`
    async fn buckets_in_range(
        &self,
        period: KlinePeriod,
        pair: Address,
        start: u64,
        end: u64,
    ) -> Result<Vec<KlineBucket>>;
}

use indexer_candles::KlinePeriod;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::models::to_i64;
use crate::pool::DatabasePool;
use crate::repositories::{KlineRepository, LiquidityRepository, TradeRepository, TransferRepository};
use crate::Result;

const DAY_SECS: u64 = 86_400;

/// How long each table keeps its rows, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub swaps_secs: u64,
    pub transfers_secs: u64,
    pub liquidity_secs: u64,
    pub minute_klines_secs: u64,
    pub hour_klines_secs: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            swaps_secs: 90 * DAY_SECS,
            transfers_secs: 90 * DAY_SECS,
            liquidity_secs: 365 * DAY_SECS,
            minute_klines_secs: KlinePeriod::Minute.retention_secs(),
            hour_klines_secs: KlinePeriod::Hour.retention_secs(),
        }
    }
}

/// Oldest timestamps that survive one prune at `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionCutoffs {
    pub swaps: u64,
    pub transfers: u64,
    pub liquidity: u64,
    pub minute_klines: u64,
    pub hour_klines: u64,
}

impl RetentionPolicy {
    pub fn cutoffs(&self, now: u64) -> RetentionCutoffs {
        RetentionCutoffs {
            swaps: now.saturating_sub(self.swaps_secs),
            transfers: now.saturating_sub(self.transfers_secs),
            liquidity: now.saturating_sub(self.liquidity_secs),
            minute_klines: now.saturating_sub(self.minute_klines_secs),
            hour_klines: now.saturating_sub(self.hour_klines_secs),
        }
    }
}

/// Rows removed by one prune
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub swaps: u64,
    pub transfers: u64,
    pub liquidity_events: u64,
    pub klines: u64,
}

/// Periodically deletes rows past their retention window
pub struct RetentionTask {
    db: DatabasePool,
    policy: RetentionPolicy,
}

impl RetentionTask {
    pub fn new(db: DatabasePool, policy: RetentionPolicy) -> Self {
        Self { db, policy }
    }

    pub async fn prune(&self, now: u64) -> Result<PruneReport> {
        let pool = self.db.inner();
        let cutoffs = self.policy.cutoffs(now);

        let minute = KlineRepository::delete_before(pool, KlinePeriod::Minute, to_i64(cutoffs.minute_klines)).await?;
        let hour = KlineRepository::delete_before(pool, KlinePeriod::Hour, to_i64(cutoffs.hour_klines)).await?;

        Ok(PruneReport {
            swaps: TradeRepository::delete_before(pool, to_i64(cutoffs.swaps)).await?,
            transfers: TransferRepository::delete_before(pool, to_i64(cutoffs.transfers)).await?,
            liquidity_events: LiquidityRepository::delete_before(pool, to_i64(cutoffs.liquidity)).await?,
            klines: minute + hour,
        })
    }

    /// Prune on every tick until the runtime shuts down
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let now = indexer_core::types::now_secs();
                match self.prune(now).await {
                    Ok(report) => info!(
                        swaps = report.swaps,
                        transfers = report.transfers,
                        liquidity_events = report.liquidity_events,
                        klines = report.klines,
                        "Retention prune completed"
                    ),
                    Err(e) => warn!(error = %e, "Retention prune failed"),
                }
            }
        })
    }
}

//! Decides which blocks run and when: a bounded backfill sweep below the head
//! and one task per live head.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use indexer_core::types::ChainBlock;
use indexer_core::{IndexerError, PriceOracle, Result, SyncConfig};
use indexer_metrics::{counters, gauges};
use indexer_processor::{BlockProcessor, BlockSummary};
use indexer_store::SyncState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::{broadcast, RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

/// New head numbers, in arrival order
pub type HeadStream = BoxStream<'static, Result<u64>>;

/// Source of new chain heads
#[async_trait]
pub trait HeadSource: Send + Sync {
    async fn subscribe(&self) -> Result<HeadStream>;
}

/// The per-block work the scheduler drives
#[async_trait]
pub trait BlockPipeline: Send + Sync {
    async fn is_processed(&self, number: u64) -> Result<bool>;

    /// `None` when the block needs no work
    async fn fetch(&self, number: u64) -> Result<Option<ChainBlock>>;

    async fn process(&self, block: ChainBlock, native_price: f64) -> Result<Option<BlockSummary>>;
}

#[async_trait]
impl BlockPipeline for BlockProcessor {
    async fn is_processed(&self, number: u64) -> Result<bool> {
        BlockProcessor::is_processed(self, number).await
    }

    async fn fetch(&self, number: u64) -> Result<Option<ChainBlock>> {
        BlockProcessor::fetch(self, number).await
    }

    async fn process(&self, block: ChainBlock, native_price: f64) -> Result<Option<BlockSummary>> {
        BlockProcessor::process(self, block, native_price).await
    }
}

/// Outcome of one backfill sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub admitted: u64,
    pub already_processed: u64,
    /// Blocks passed over because the native price could not be read
    pub price_failures: u64,
}

/// Live subscription states
enum LiveState {
    Reconnecting { attempt: u32 },
    Subscribed(HeadStream),
}

#[derive(Clone)]
pub struct BlockScheduler {
    pipeline: Arc<dyn BlockPipeline>,
    oracle: Arc<dyn PriceOracle>,
    sync_state: Arc<RwLock<SyncState>>,
    config: SyncConfig,
    shutdown_flag: Arc<AtomicBool>,
}

impl BlockScheduler {
    pub fn new(
        pipeline: Arc<dyn BlockPipeline>,
        oracle: Arc<dyn PriceOracle>,
        sync_state: Arc<RwLock<SyncState>>,
        config: SyncConfig,
    ) -> Self {
        Self {
            pipeline,
            oracle,
            sync_state,
            config,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set once shutdown is requested; backfill stops admitting blocks
    pub fn shutdown_flag(&self) -> &Arc<AtomicBool> {
        &self.shutdown_flag
    }

    /// Walk `[head - depth, head)` ascending through a bounded worker pool.
    ///
    /// The native price is read every `price_refresh_interval` admitted
    /// blocks and reused in between. A failed price read passes over the
    /// block and the next block retries the read. Returns once every admitted
    /// block has finished.
    pub async fn backfill(&self, head: u64) -> Result<BackfillReport> {
        let mut report = BackfillReport::default();
        if self.config.retrieve_old_block_num < 0 {
            info!("Backfill disabled");
            self.sync_state.write().await.complete_backfill();
            return Ok(report);
        }

        let start = head.saturating_sub(self.config.retrieve_old_block_num as u64);
        let capacity = self.config.max_concurrent_blocks;
        let interval = self.config.price_refresh_interval.max(1);
        let pause = Duration::from_millis(self.config.backfill_sleep_ms);
        info!(from = start, to = head, concurrency = capacity, "Starting backfill");

        let semaphore = Arc::new(Semaphore::new(capacity));
        let mut tasks = JoinSet::new();
        let mut price = 0.0;

        for number in start..head {
            if self.shutdown_flag.load(Ordering::Relaxed) {
                info!(block = number, "Shutdown requested, backfill stops admitting");
                break;
            }

            match self.pipeline.is_processed(number).await {
                Ok(true) => {
                    trace!(block = number, "Already processed");
                    report.already_processed += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(block = number, error = %e, "Ledger check failed, leaving block for the next sweep");
                    continue;
                }
            }

            if report.admitted % interval == 0 {
                match self.oracle.native_price(Some(number)).await {
                    Ok(fresh) => price = fresh,
                    Err(e) => {
                        warn!(block = number, error = %e, "Native price unavailable, skipping block");
                        report.price_failures += 1;
                        counters::blocks_dropped(1, "price");
                        continue;
                    }
                }
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| IndexerError::Sync(e.to_string()))?;
            self.set_in_flight(capacity - semaphore.available_permits()).await;

            let scheduler = self.clone();
            let pool = semaphore.clone();
            tasks.spawn(async move {
                scheduler.run_block(number, price).await;
                drop(permit);
                scheduler
                    .set_in_flight(capacity - pool.available_permits())
                    .await;
            });

            report.admitted += 1;
            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }
            tokio::time::sleep(pause).await;
        }

        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }

        self.sync_state.write().await.complete_backfill();
        gauges::set_backfill_in_flight(0);
        info!(
            admitted = report.admitted,
            already_processed = report.already_processed,
            price_failures = report.price_failures,
            "Backfill complete"
        );
        Ok(report)
    }

    /// Follow new heads until `shutdown` fires, resubscribing with a fixed
    /// backoff whenever the subscription fails or ends. Blocks already spawned
    /// are awaited before returning.
    pub async fn run_live(&self, heads: Arc<dyn HeadSource>, mut shutdown: broadcast::Receiver<()>) {
        let backoff = Duration::from_secs(self.config.reconnect_delay_secs);
        let mut tasks = JoinSet::new();
        let mut state = LiveState::Reconnecting { attempt: 0 };

        loop {
            state = select! {
                _ = shutdown.recv() => break,
                next = self.advance(state, heads.as_ref(), backoff, &mut tasks) => next,
            };
            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }
        }

        info!(in_flight = tasks.len(), "Live sync stopping, waiting for in-flight blocks");
        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }
    }

    async fn advance(
        &self,
        state: LiveState,
        heads: &dyn HeadSource,
        backoff: Duration,
        tasks: &mut JoinSet<()>,
    ) -> LiveState {
        match state {
            LiveState::Reconnecting { attempt } => match heads.subscribe().await {
                Ok(stream) => {
                    info!(attempt, "Head subscription established");
                    LiveState::Subscribed(stream)
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Head subscription failed, retrying");
                    counters::errors(1, "subscription");
                    tokio::time::sleep(backoff).await;
                    LiveState::Reconnecting { attempt: attempt + 1 }
                }
            },
            LiveState::Subscribed(mut stream) => match stream.next().await {
                Some(Ok(number)) => {
                    self.spawn_live(number, tasks).await;
                    LiveState::Subscribed(stream)
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Head subscription dropped");
                    counters::errors(1, "subscription");
                    tokio::time::sleep(backoff).await;
                    LiveState::Reconnecting { attempt: 1 }
                }
                None => {
                    warn!("Head subscription closed");
                    tokio::time::sleep(backoff).await;
                    LiveState::Reconnecting { attempt: 1 }
                }
            },
        }
    }

    async fn spawn_live(&self, number: u64, tasks: &mut JoinSet<()>) {
        self.sync_state.write().await.observe_head(number);
        gauges::set_head_block(number);

        let height = self.config.development_mode.then_some(number);
        let scheduler = self.clone();
        tasks.spawn(async move {
            match scheduler.oracle.native_price(height).await {
                Ok(price) => {
                    scheduler.run_block(number, price).await;
                }
                Err(e) => {
                    error!(block = number, error = %e, "Native price unavailable, dropping block");
                    counters::blocks_dropped(1, "price");
                    scheduler.sync_state.write().await.record_failure();
                }
            }
        });
    }

    /// Fetch then process one block. Failures leave it unmarked for the next sweep.
    pub async fn run_block(&self, number: u64, native_price: f64) -> Option<BlockSummary> {
        let block = match self.pipeline.fetch(number).await {
            Ok(Some(block)) => block,
            Ok(None) => return None,
            Err(e) => {
                warn!(block = number, error = %e, "Block fetch failed, dropping block");
                counters::blocks_dropped(1, "fetch");
                self.sync_state.write().await.record_failure();
                return None;
            }
        };

        match self.pipeline.process(block, native_price).await {
            Ok(summary) => {
                if let Some(summary) = &summary {
                    debug!(block = number, swaps = summary.swaps, "Block done");
                }
                summary
            }
            Err(e) => {
                error!(block = number, error = %e, "Block processing failed");
                counters::blocks_dropped(1, "process");
                counters::errors(1, if e.is_transient() { "transient" } else { "process" });
                self.sync_state.write().await.record_failure();
                None
            }
        }
    }

    async fn set_in_flight(&self, count: usize) {
        self.sync_state.write().await.backfill_in_flight = count;
        gauges::set_backfill_in_flight(count);
    }
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Block task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use futures::stream;
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPipeline {
        processed: Mutex<HashSet<u64>>,
        runs: Mutex<Vec<(u64, f64)>>,
        failing_fetch: HashSet<u64>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl RecordingPipeline {
        fn with_processed(numbers: impl IntoIterator<Item = u64>) -> Self {
            let pipeline = Self::default();
            pipeline.processed.lock().unwrap().extend(numbers);
            pipeline
        }

        fn runs(&self) -> Vec<(u64, f64)> {
            let mut runs = self.runs.lock().unwrap().clone();
            runs.sort_by_key(|(number, _)| *number);
            runs
        }
    }

    #[async_trait]
    impl BlockPipeline for RecordingPipeline {
        async fn is_processed(&self, number: u64) -> Result<bool> {
            Ok(self.processed.lock().unwrap().contains(&number))
        }

        async fn fetch(&self, number: u64) -> Result<Option<ChainBlock>> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;

            if self.failing_fetch.contains(&number) {
                self.active.fetch_sub(1, Ordering::SeqCst);
                return Err(IndexerError::Rpc(format!("block {} unavailable", number)));
            }
            Ok(Some(ChainBlock {
                number,
                hash: B256::with_last_byte(number as u8),
                timestamp: 0,
                transactions: Vec::new(),
            }))
        }

        async fn process(&self, block: ChainBlock, native_price: f64) -> Result<Option<BlockSummary>> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.runs.lock().unwrap().push((block.number, native_price));
            self.processed.lock().unwrap().insert(block.number);
            Ok(Some(BlockSummary {
                number: block.number,
                ..Default::default()
            }))
        }
    }

    /// Price equals the requested height; listed heights fail
    #[derive(Default)]
    struct HeightOracle {
        failing: HashSet<u64>,
        requests: Mutex<Vec<Option<u64>>>,
    }

    #[async_trait]
    impl PriceOracle for HeightOracle {
        async fn native_price(&self, height: Option<u64>) -> Result<f64> {
            self.requests.lock().unwrap().push(height);
            match height {
                Some(h) if self.failing.contains(&h) => Err(IndexerError::Rpc("archive down".into())),
                Some(h) => Ok(h as f64),
                None => Ok(1.0),
            }
        }
    }

    fn config(depth: i64, interval: u64, concurrency: usize) -> SyncConfig {
        SyncConfig {
            retrieve_old_block_num: depth,
            price_refresh_interval: interval,
            max_concurrent_blocks: concurrency,
            backfill_sleep_ms: 1,
            reconnect_delay_secs: 5,
            development_mode: false,
        }
    }

    fn scheduler(
        pipeline: Arc<RecordingPipeline>,
        oracle: Arc<HeightOracle>,
        config: SyncConfig,
    ) -> BlockScheduler {
        BlockScheduler::new(pipeline, oracle, Arc::new(RwLock::new(SyncState::new())), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_backfill_respects_concurrency_cap() {
        let pipeline = Arc::new(RecordingPipeline::default());
        let oracle = Arc::new(HeightOracle::default());
        let scheduler = scheduler(pipeline.clone(), oracle, config(40, 20, 3));

        let report = scheduler.backfill(1_000).await.unwrap();

        assert_eq!(report.admitted, 40);
        assert_eq!(pipeline.runs().len(), 40);
        assert_eq!(pipeline.runs()[0].0, 960);
        assert_eq!(pipeline.peak.load(Ordering::SeqCst), 3);
        let state = scheduler.sync_state.read().await;
        assert!(state.backfill_complete);
        assert_eq!(state.backfill_in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backfill_price_refresh_cadence() {
        let pipeline = Arc::new(RecordingPipeline::default());
        let oracle = Arc::new(HeightOracle::default());
        let scheduler = scheduler(pipeline.clone(), oracle.clone(), config(10, 4, 10));

        scheduler.backfill(110).await.unwrap();

        let requests = oracle.requests.lock().unwrap().clone();
        assert_eq!(requests, vec![Some(100), Some(104), Some(108)]);
        let prices: Vec<f64> = pipeline.runs().iter().map(|(_, price)| *price).collect();
        assert_eq!(
            prices,
            vec![100.0, 100.0, 100.0, 100.0, 104.0, 104.0, 104.0, 104.0, 108.0, 108.0]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_backfill_price_failure_skips_block_and_retries() {
        let pipeline = Arc::new(RecordingPipeline::default());
        let oracle = Arc::new(HeightOracle {
            failing: HashSet::from([100]),
            ..Default::default()
        });
        let scheduler = scheduler(pipeline.clone(), oracle.clone(), config(6, 4, 10));

        let report = scheduler.backfill(106).await.unwrap();

        assert_eq!(report.price_failures, 1);
        assert_eq!(report.admitted, 5);
        let requests = oracle.requests.lock().unwrap().clone();
        assert_eq!(requests, vec![Some(100), Some(101), Some(105)]);
        let runs = pipeline.runs();
        assert_eq!(runs.first(), Some(&(101, 101.0)));
        assert_eq!(runs.last(), Some(&(105, 105.0)));
        assert!(!pipeline.processed.lock().unwrap().contains(&100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backfill_skips_processed_and_survives_fetch_errors() {
        let mut pipeline = RecordingPipeline::with_processed([51, 52]);
        pipeline.failing_fetch.insert(54);
        let pipeline = Arc::new(pipeline);
        let oracle = Arc::new(HeightOracle::default());
        let scheduler = scheduler(pipeline.clone(), oracle, config(6, 20, 2));

        let report = scheduler.backfill(56).await.unwrap();

        assert_eq!(report.already_processed, 2);
        assert_eq!(report.admitted, 4);
        let numbers: Vec<u64> = pipeline.runs().iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![50, 53, 55]);
        assert_eq!(scheduler.sync_state.read().await.stats.blocks_failed, 1);
    }

    #[tokio::test]
    async fn test_negative_depth_disables_backfill() {
        let pipeline = Arc::new(RecordingPipeline::default());
        let oracle = Arc::new(HeightOracle::default());
        let scheduler = scheduler(pipeline.clone(), oracle.clone(), config(-1, 20, 2));

        let report = scheduler.backfill(1_000).await.unwrap();
        assert_eq!(report, BackfillReport::default());
        assert!(pipeline.runs().is_empty());
        assert!(oracle.requests.lock().unwrap().is_empty());
    }

    /// Hands out scripted subscriptions; `None` entries fail to subscribe
    struct ScriptedHeads {
        script: Mutex<VecDeque<Option<Vec<Result<u64>>>>>,
        attempts: AtomicUsize,
    }

    impl ScriptedHeads {
        fn new(script: Vec<Option<Vec<Result<u64>>>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                attempts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HeadSource for ScriptedHeads {
        async fn subscribe(&self) -> Result<HeadStream> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop_front() {
                Some(Some(heads)) => Ok(Box::pin(stream::iter(heads))),
                Some(None) => Err(IndexerError::WebSocket("connection refused".into())),
                // last subscription stays open
                None => Ok(Box::pin(stream::pending())),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_reconnects_after_failures() {
        let pipeline = Arc::new(RecordingPipeline::default());
        let oracle = Arc::new(HeightOracle::default());
        let scheduler = scheduler(pipeline.clone(), oracle.clone(), config(0, 20, 2));
        let heads = Arc::new(ScriptedHeads::new(vec![
            None,
            Some(vec![Ok(200), Err(IndexerError::WebSocket("reset".into()))]),
            Some(vec![Ok(201)]),
        ]));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let live = {
            let scheduler = scheduler.clone();
            let heads = heads.clone();
            tokio::spawn(async move { scheduler.run_live(heads, shutdown_rx).await })
        };

        while pipeline.runs().len() < 2 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        shutdown_tx.send(()).unwrap();
        live.await.unwrap();

        assert_eq!(pipeline.runs(), vec![(200, 1.0), (201, 1.0)]);
        // refused, then dropped by an error, then ended
        assert_eq!(heads.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(*oracle.requests.lock().unwrap(), vec![None, None]);
        assert_eq!(scheduler.sync_state.read().await.head_block, 201);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_development_mode_prices_at_height() {
        let pipeline = Arc::new(RecordingPipeline::default());
        let oracle = Arc::new(HeightOracle::default());
        let mut config = config(0, 20, 2);
        config.development_mode = true;
        let scheduler = scheduler(pipeline.clone(), oracle, config);
        let heads = Arc::new(ScriptedHeads::new(vec![Some(vec![Ok(300)])]));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let live = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run_live(heads, shutdown_rx).await })
        };

        while pipeline.runs().is_empty() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        shutdown_tx.send(()).unwrap();
        live.await.unwrap();

        assert_eq!(pipeline.runs(), vec![(300, 300.0)]);
    }
}

use indexer_core::{ChainClient, IndexerConfig, IndexerError, PriceOracle, Result};
use indexer_processor::{BlockProcessor, BlockSummary};
use indexer_store::SyncState;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

use crate::oracle::NativePriceOracle;
use crate::provider::ProviderManager;
use crate::scheduler::{BlockScheduler, HeadSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownCause {
    Signal,
    Lagged(u64),
    /// No shutdown can arrive any more
    SenderDropped,
}

async fn wait_for_shutdown(shutdown: &mut broadcast::Receiver<()>) -> ShutdownCause {
    match shutdown.recv().await {
        Ok(()) => ShutdownCause::Signal,
        Err(broadcast::error::RecvError::Lagged(missed)) => ShutdownCause::Lagged(missed),
        Err(broadcast::error::RecvError::Closed) => ShutdownCause::SenderDropped,
    }
}

/// Runs the backfill sweep in the background and follows live heads
pub struct SyncEngine {
    client: Arc<dyn ChainClient>,
    heads: Arc<dyn HeadSource>,
    processor: Arc<BlockProcessor>,
    oracle: Arc<dyn PriceOracle>,
    scheduler: BlockScheduler,
    sync_state: Arc<RwLock<SyncState>>,
}

impl SyncEngine {
    /// Engine over the alloy providers; the processor shares the same client
    pub fn new(
        config: &IndexerConfig,
        provider: Arc<ProviderManager>,
        processor: Arc<BlockProcessor>,
        sync_state: Arc<RwLock<SyncState>>,
    ) -> Self {
        let oracle = Arc::new(NativePriceOracle::new(
            config.chain,
            config.native_price_pool,
            &provider,
        ));
        Self::with_parts(config, provider.clone(), provider, processor, oracle, sync_state)
    }

    pub fn with_parts(
        config: &IndexerConfig,
        client: Arc<dyn ChainClient>,
        heads: Arc<dyn HeadSource>,
        processor: Arc<BlockProcessor>,
        oracle: Arc<dyn PriceOracle>,
        sync_state: Arc<RwLock<SyncState>>,
    ) -> Self {
        let scheduler = BlockScheduler::new(
            processor.clone(),
            oracle.clone(),
            sync_state.clone(),
            config.sync.clone(),
        );

        Self {
            client,
            heads,
            processor,
            oracle,
            scheduler,
            sync_state,
        }
    }

    pub fn processor(&self) -> &Arc<BlockProcessor> {
        &self.processor
    }

    /// Run until `shutdown` fires. In-flight blocks of both paths finish
    /// before this returns.
    pub async fn run(&self, shutdown: broadcast::Receiver<()>) -> Result<()> {
        let shutdown_flag = Arc::clone(self.scheduler.shutdown_flag());
        let mut shutdown_listener = shutdown.resubscribe();
        tokio::spawn(async move {
            match wait_for_shutdown(&mut shutdown_listener).await {
                ShutdownCause::Signal => info!("Shutdown flag set"),
                ShutdownCause::Lagged(missed) => {
                    warn!(missed, "Shutdown listener lagged, setting shutdown flag")
                }
                ShutdownCause::SenderDropped => {
                    warn!("Shutdown sender dropped, stopping admission")
                }
            }
            shutdown_flag.store(true, Ordering::SeqCst);
        });

        let head = self.client.head_number().await?;
        self.sync_state.write().await.observe_head(head);
        indexer_metrics::gauges::set_head_block(head);
        info!(head, "Chain head");

        let backfill = {
            let scheduler = self.scheduler.clone();
            tokio::spawn(async move { scheduler.backfill(head).await })
        };

        self.scheduler.run_live(self.heads.clone(), shutdown).await;

        match backfill.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!(error = %e, "Backfill failed"),
            Err(e) => error!(error = %e, "Backfill task panicked"),
        }

        self.print_status().await;
        info!("Sync engine shutdown complete");
        Ok(())
    }

    /// Reprocess one block from scratch, priced at its own height
    pub async fn debug_block(&self, number: u64) -> Result<Option<BlockSummary>> {
        warn!(block = number, "Debug mode: reprocessing a single block");
        self.processor.unmark(number).await?;

        let price = self.oracle.native_price(Some(number)).await?;
        let block = self
            .processor
            .fetch(number)
            .await?
            .ok_or_else(|| IndexerError::Sync(format!("block {} still marked processed", number)))?;

        let summary = self.processor.process(block, price).await?;
        if let Some(summary) = &summary {
            info!(
                block = number,
                swaps = summary.swaps,
                transfers = summary.transfers,
                liquidity_events = summary.liquidity_events,
                volume_usd = summary.volume_usd,
                "Debug block processed"
            );
        }
        Ok(summary)
    }

    pub async fn print_status(&self) {
        let state = self.sync_state.read().await;
        info!(
            mode = ?state.mode,
            head = state.head_block,
            last_block = state.last_processed_block,
            lag = state.lag(),
            processed = state.stats.blocks_processed,
            skipped = state.stats.blocks_skipped,
            failed = state.stats.blocks_failed,
            swaps = state.stats.swaps_indexed,
            pairs = state.stats.pairs_discovered,
            "Current status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::HeadStream;
    use alloy_primitives::{Address, B256, U256};
    use async_trait::async_trait;
    use futures::stream;
    use indexer_core::types::{ChainBlock, ChainLog, ProtocolVariant};
    use indexer_core::{Chain, HackProbe, ProcessorConfig, QuoteAssets, SyncConfig};
    use indexer_processor::StorageHandles;
    use indexer_store::IndexerStore;
    use std::time::Duration;

    /// Empty blocks up to `head`
    struct EmptyChain {
        head: u64,
    }

    #[async_trait]
    impl ChainClient for EmptyChain {
        async fn head_number(&self) -> Result<u64> {
            Ok(self.head)
        }

        async fn block(&self, number: u64) -> Result<Option<ChainBlock>> {
            Ok((number <= self.head).then(|| ChainBlock {
                number,
                hash: B256::with_last_byte(number as u8),
                timestamp: 1_700_000_000 + number,
                transactions: Vec::new(),
            }))
        }

        async fn receipt_logs(&self, _tx_hash: B256) -> Result<Vec<ChainLog>> {
            Ok(Vec::new())
        }

        async fn token_decimals(&self, token: Address) -> Result<u8> {
            Err(IndexerError::TokenNotFound(token))
        }

        async fn token_name(&self, token: Address) -> Result<String> {
            Err(IndexerError::TokenNotFound(token))
        }

        async fn token_symbol(&self, token: Address) -> Result<String> {
            Err(IndexerError::TokenNotFound(token))
        }

        async fn token_total_supply(&self, token: Address) -> Result<U256> {
            Err(IndexerError::TokenNotFound(token))
        }

        async fn balance_of(&self, _token: Address, _owner: Address) -> Result<U256> {
            Ok(U256::ZERO)
        }

        async fn pair_tokens(&self, pair: Address) -> Result<(Address, Address)> {
            Err(IndexerError::PairNotFound(pair))
        }

        async fn pool_variant(&self, _pair: Address) -> Result<ProtocolVariant> {
            Ok(ProtocolVariant::Unknown)
        }

        async fn hack_probe(&self, _probe: &HackProbe) -> Result<bool> {
            Ok(false)
        }
    }

    #[async_trait]
    impl HeadSource for EmptyChain {
        async fn subscribe(&self) -> Result<HeadStream> {
            Ok(Box::pin(stream::pending()))
        }
    }

    struct FixedOracle;

    #[async_trait]
    impl PriceOracle for FixedOracle {
        async fn native_price(&self, height: Option<u64>) -> Result<f64> {
            Ok(height.map_or(2000.0, |h| h as f64))
        }
    }

    fn engine(head: u64, depth: i64) -> (SyncEngine, IndexerStore) {
        let config = IndexerConfig {
            chain: Chain::Eth,
            rpc_url: String::new(),
            ws_url: String::new(),
            archive_rpc_url: String::new(),
            quotes: QuoteAssets::new([Address::repeat_byte(0xa0)], [Address::repeat_byte(0xc0)]),
            routers: Vec::new(),
            special_addresses: Vec::new(),
            native_price_pool: Address::ZERO,
            hack_check_contract: None,
            sync: SyncConfig {
                retrieve_old_block_num: depth,
                backfill_sleep_ms: 1,
                ..SyncConfig::default()
            },
            processor: ProcessorConfig::default(),
        };

        let store = IndexerStore::with_swap_contracts(config.static_swap_contracts());
        let chain = Arc::new(EmptyChain { head });
        let processor = Arc::new(BlockProcessor::new(
            chain.clone(),
            StorageHandles::in_memory(&store),
            store.cache.clone(),
            store.sync_state.clone(),
            &config,
        ));
        let engine = SyncEngine::with_parts(
            &config,
            chain.clone(),
            chain,
            processor,
            Arc::new(FixedOracle),
            store.sync_state.clone(),
        );
        (engine, store)
    }

    #[tokio::test]
    async fn test_shutdown_cause_distinguishes_dropped_sender() {
        let (tx, mut rx) = broadcast::channel(1);
        tx.send(()).unwrap();
        assert_eq!(wait_for_shutdown(&mut rx).await, ShutdownCause::Signal);

        tx.send(()).unwrap();
        tx.send(()).unwrap();
        assert_eq!(wait_for_shutdown(&mut rx).await, ShutdownCause::Lagged(1));

        let (tx, mut rx) = broadcast::channel::<()>(1);
        drop(tx);
        assert_eq!(wait_for_shutdown(&mut rx).await, ShutdownCause::SenderDropped);
    }

    #[tokio::test]
    async fn test_debug_block_reprocesses_at_height() {
        let (engine, store) = engine(50, -1);

        let first = engine.debug_block(42).await.unwrap().unwrap();
        assert_eq!(first.number, 42);
        assert_eq!(store.ledger.get(42).unwrap().native_price, 42.0);

        // a processed block is unmarked and runs again
        let again = engine.debug_block(42).await.unwrap();
        assert!(again.is_some());
        assert_eq!(store.ledger.count(), 1);
    }

    #[tokio::test]
    async fn test_run_backfills_until_shutdown() {
        let (engine, store) = engine(20, 5);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let engine = Arc::new(engine);
        let running = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run(shutdown_rx).await })
        };

        while !store.sync_state.read().await.backfill_complete {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown_tx.send(()).unwrap();
        running.await.unwrap().unwrap();

        assert_eq!(store.ledger.count(), 5);
        assert_eq!(store.ledger.latest(), Some(19));
        assert!(store.ledger.get(20).is_none());
        assert_eq!(store.sync_state.read().await.head_block, 20);
    }
}

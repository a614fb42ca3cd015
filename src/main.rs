use indexer_core::IndexerConfig;
use indexer_db::{DatabaseConfig, DatabasePool, PgStore, RetentionPolicy, RetentionTask};
use indexer_metrics::{MetricsConfig, MetricsServer};
use indexer_processor::{BlockProcessor, StorageHandles};
use indexer_store::IndexerStore;
use indexer_sync::{ProviderManager, SyncEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// `--block <N>` selects the single-block debug run
fn debug_block_arg() -> anyhow::Result<Option<u64>> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--block" {
            let value = args
                .next()
                .ok_or_else(|| anyhow::anyhow!("--block needs a block number"))?;
            return Ok(Some(value.parse()?));
        }
    }
    Ok(None)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("indexer_sync=info".parse()?)
                .add_directive("indexer_processor=info".parse()?),
        )
        .init();

    let debug_block = debug_block_arg()?;

    let config = match IndexerConfig::load() {
        Ok(config) => {
            info!(
                chain = %config.chain,
                usd_quotes = config.quotes.usd_tokens().count(),
                native_quotes = config.quotes.native_tokens().count(),
                routers = config.routers.len(),
                price_pool = ?config.native_price_pool,
                backfill_depth = config.sync.retrieve_old_block_num,
                "Configuration loaded from deployment"
            );
            config
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let shutdown_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received (Ctrl+C)");
        shutdown_signal.send(()).ok();
    });

    if MetricsConfig::enabled_in_env() {
        let handle = indexer_metrics::init()?;
        let metrics_server = MetricsServer::new(MetricsConfig::from_env(), handle);
        let metrics_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = metrics_server.run(metrics_shutdown).await {
                error!(error = %e, "Metrics server error");
            }
        });
    }

    let store = IndexerStore::with_swap_contracts(config.static_swap_contracts());

    let (db_pool, pg_store, storage) = match DatabaseConfig::from_env() {
        Some(db_config) => {
            let pool = match DatabasePool::new(&db_config).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    std::process::exit(1);
                }
            };
            if let Err(e) = pool.migrate().await {
                error!(error = %e, "Failed to run database migrations");
                std::process::exit(1);
            }
            indexer_metrics::gauges::set_db_connections(pool.connections());
            info!("Database connected and migrations applied");

            if db_config.retention_interval_secs > 0 && debug_block.is_none() {
                RetentionTask::new(pool.clone(), RetentionPolicy::default())
                    .spawn(Duration::from_secs(db_config.retention_interval_secs));
            }

            let backend = Arc::new(PgStore::new(pool.clone()));
            match backend.latest_block().await {
                Ok(Some(latest)) => info!(latest_block = latest, "Resuming over existing ledger"),
                Ok(None) => info!("Ledger is empty"),
                Err(e) => warn!(error = %e, "Failed to read the ledger head"),
            }
            (Some(pool), Some(backend.clone()), StorageHandles::shared(backend))
        }
        None => {
            warn!("DATABASE_URL not set, running with the in-memory store");
            (None, None, StorageHandles::in_memory(&store))
        }
    };

    // Known pairs must be swap contracts before the first block is attributed
    match storage.pairs.all_pairs().await {
        Ok(pairs) => {
            let count = pairs.len();
            for pair in pairs {
                store.cache.insert_pair(pair);
            }
            indexer_metrics::gauges::set_cache_pairs(store.cache.pair_count());
            info!(pairs = count, "Pair cache warmed");
        }
        Err(e) => warn!(error = %e, "Failed to load pairs, starting with a cold cache"),
    }

    let provider = match ProviderManager::new(
        &config.rpc_url,
        &config.archive_rpc_url,
        &config.ws_url,
    )
    .await
    {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            error!(error = %e, "Failed to create chain providers");
            std::process::exit(1);
        }
    };

    let processor = Arc::new(BlockProcessor::new(
        provider.clone(),
        storage,
        store.cache.clone(),
        store.sync_state.clone(),
        &config,
    ));
    let engine = SyncEngine::new(&config, provider, processor, store.sync_state.clone());

    if let Some(number) = debug_block {
        if let Err(e) = engine.debug_block(number).await {
            error!(block = number, error = %e, "Debug block failed");
            std::process::exit(1);
        }
        if let Some(pg) = &pg_store {
            match pg.block(number).await {
                Ok(Some(record)) => info!(
                    block = record.number,
                    hash = %record.hash,
                    swaps = record.tx_num,
                    volume_usd = record.volume_usd,
                    native_price = record.native_price,
                    "Ledger row written"
                ),
                Ok(None) => warn!(block = number, "Block missing from the ledger after processing"),
                Err(e) => warn!(block = number, error = %e, "Failed to read back the ledger row"),
            }
        }
        return Ok(());
    }

    let status_state = store.sync_state.clone();
    let status_cache = store.cache.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let state = status_state.read().await;
            info!(
                mode = ?state.mode,
                head = state.head_block,
                last_block = state.last_processed_block,
                lag = state.lag(),
                in_flight = state.backfill_in_flight,
                swaps = state.stats.swaps_indexed,
                failed = state.stats.blocks_failed,
                pairs = status_cache.pair_count(),
                "Status"
            );
        }
    });

    if let Err(e) = engine.run(shutdown_rx).await {
        error!(error = %e, "Sync engine error");
        std::process::exit(1);
    }

    info!("Shutting down...");
    if let Some(db) = db_pool {
        db.close().await;
        info!("Database connections closed");
    }

    info!("DEX indexer shutdown complete");
    Ok(())
}

use alloy_primitives::{Address, B256};
use dashmap::DashMap;
use futures::{stream, StreamExt, TryStreamExt};
use indexer_candles::{KlineEngine, KlinePeriod, KlineTrade};
use indexer_core::types::{
    now_secs, BlockRecord, ChainBlock, Direction, EventKey, FirstLiquidity, HackType,
    LiquidityEvent, Pair, Swap, Token, Transfer,
};
use indexer_core::{ChainClient, IndexerConfig, IndexerError, ProcessorConfig, QuoteAssets, Result};
use indexer_store::{PairCache, SyncState};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};

use crate::attribution::attribute_block;
use crate::deadline::Deadlines;
use crate::decoder::{decode_log, DecodedEvent, LiquidityLog, PairCreatedLog, SwapLog, TransferLog};
use crate::math::transfer_amount;
use crate::resolver::MetadataResolver;
use crate::storage::StorageHandles;
use crate::trade_stats::{self, HOUR_CANDLES, MINUTE_CANDLES};
use crate::valuation::{
    classify_transfers, liquidity_event_usd, main_token, pool_liquidity, swap_price_usd, unit_usd,
};

/// Receipts requested concurrently while fetching one block
const RECEIPT_CONCURRENCY: usize = 16;
/// Token metadata lookups in flight while decoding transfers
const TOKEN_CONCURRENCY: usize = 8;

/// What one processed block produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockSummary {
    pub number: u64,
    pub pairs_created: usize,
    pub swaps: usize,
    pub transfers: usize,
    pub liquidity_events: usize,
    pub unrecognized_logs: usize,
    pub volume_usd: f64,
    /// False when the ledger already held the block at the final mark
    pub newly_marked: bool,
}

/// Decoded event together with the transaction context it came from
#[derive(Debug, Clone)]
struct Located<T> {
    key: EventKey,
    operator: Address,
    gas_price: u128,
    event: T,
}

#[derive(Debug, Default)]
struct DecodedBlock {
    pairs_created: Vec<Located<PairCreatedLog>>,
    swaps: Vec<Located<SwapLog>>,
    liquidity: Vec<Located<LiquidityLog>>,
    transfers: Vec<Located<TransferLog>>,
    log_counts: HashMap<B256, usize>,
    unrecognized: usize,
}

impl DecodedBlock {
    fn decode(block: &ChainBlock) -> Self {
        let mut decoded = Self::default();

        for tx in &block.transactions {
            decoded.log_counts.insert(tx.hash, tx.logs.len());

            for log in &tx.logs {
                let key = EventKey::new(tx.hash, log.log_index);
                let (operator, gas_price) = (tx.from, tx.gas_price);
                match decode_log(log) {
                    DecodedEvent::PairCreated(event) => decoded.pairs_created.push(Located {
                        key,
                        operator,
                        gas_price,
                        event,
                    }),
                    DecodedEvent::Swap(event) => decoded.swaps.push(Located {
                        key,
                        operator,
                        gas_price,
                        event,
                    }),
                    DecodedEvent::Liquidity(event) => decoded.liquidity.push(Located {
                        key,
                        operator,
                        gas_price,
                        event,
                    }),
                    DecodedEvent::Transfer(event) => decoded.transfers.push(Located {
                        key,
                        operator,
                        gas_price,
                        event,
                    }),
                    DecodedEvent::Unrecognized(raw) => {
                        trace!(
                            block = block.number,
                            tx_hash = ?tx.hash,
                            address = ?raw.address,
                            topic0 = ?raw.topic0,
                            topics = raw.topic_count,
                            "Skipping unrecognized log"
                        );
                        decoded.unrecognized += 1;
                    }
                }
            }
        }

        decoded
    }
}

/// Removes the block number from the in-flight set when dropped
struct BlockClaim<'a> {
    in_flight: &'a DashMap<u64, ()>,
    number: u64,
}

impl Drop for BlockClaim<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.number);
    }
}

/// Runs one block through decode, attribution, persistence and aggregation
pub struct BlockProcessor {
    client: Arc<dyn ChainClient>,
    storage: StorageHandles,
    klines: KlineEngine,
    cache: Arc<PairCache>,
    resolver: MetadataResolver,
    sync_state: Arc<RwLock<SyncState>>,
    quotes: QuoteAssets,
    hack_checker: Option<Address>,
    config: ProcessorConfig,
    deadlines: Deadlines,
    in_flight: DashMap<u64, ()>,
}

impl BlockProcessor {
    pub fn new(
        client: Arc<dyn ChainClient>,
        storage: StorageHandles,
        cache: Arc<PairCache>,
        sync_state: Arc<RwLock<SyncState>>,
        config: &IndexerConfig,
    ) -> Self {
        let deadlines = Deadlines::from_config(&config.processor);
        let resolver = MetadataResolver::new(
            client.clone(),
            storage.pairs.clone(),
            cache.clone(),
            config.quotes.clone(),
            deadlines,
        );

        Self {
            client,
            klines: KlineEngine::new(storage.klines.clone()),
            storage,
            cache,
            resolver,
            sync_state,
            quotes: config.quotes.clone(),
            hack_checker: config.hack_check_contract,
            config: config.processor.clone(),
            deadlines,
            in_flight: DashMap::new(),
        }
    }

    pub fn klines(&self) -> &KlineEngine {
        &self.klines
    }

    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    pub async fn is_processed(&self, number: u64) -> Result<bool> {
        self.deadlines
            .storage("is_processed", self.storage.ledger.is_processed(number))
            .await
    }

    /// Forget a block so it can be processed again
    pub async fn unmark(&self, number: u64) -> Result<()> {
        self.deadlines
            .storage("unmark", self.storage.ledger.unmark(number))
            .await
    }

    fn claim(&self, number: u64) -> Option<BlockClaim<'_>> {
        match self.in_flight.entry(number) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Some(BlockClaim {
                    in_flight: &self.in_flight,
                    number,
                })
            }
        }
    }

    /// Fetch a block and the receipt logs of its contract-call transactions.
    ///
    /// Returns `None` for blocks the ledger already holds. Any receipt
    /// failure fails the whole block.
    pub async fn fetch(&self, number: u64) -> Result<Option<ChainBlock>> {
        let start = Instant::now();

        if self.is_processed(number).await? {
            debug!(block = number, "Block already processed, skipping fetch");
            return Ok(None);
        }

        let mut block = self
            .deadlines
            .rpc("eth_getBlockByNumber", self.client.block(number))
            .await?
            .ok_or_else(|| IndexerError::Rpc(format!("block {} not available", number)))?;

        let total_txs = block.transactions.len();
        block.transactions.retain(|tx| tx.has_input);

        let hashes: Vec<B256> = block.transactions.iter().map(|tx| tx.hash).collect();
        let receipts: Vec<_> = stream::iter(hashes)
            .map(|hash| async move {
                self.deadlines
                    .rpc("eth_getTransactionReceipt", self.client.receipt_logs(hash))
                    .await
            })
            .buffered(RECEIPT_CONCURRENCY)
            .try_collect()
            .await?;

        for (tx, logs) in block.transactions.iter_mut().zip(receipts) {
            tx.logs = logs;
        }

        let elapsed = start.elapsed();
        indexer_metrics::histograms::block_fetch_duration(elapsed);
        debug!(
            block = number,
            txs = block.transactions.len(),
            skipped_txs = total_txs - block.transactions.len(),
            logs = block.log_count(),
            fetch_ms = elapsed.as_millis(),
            "Fetched block"
        );

        Ok(Some(block))
    }

    /// Process a fetched block and mark it in the ledger.
    ///
    /// Returns `None` when the block is already processed or another task is
    /// processing it. Persistence failures fail the block and leave it
    /// unmarked; failures of derived data (candles, statistics, liquidity)
    /// are logged and the block carries on.
    pub async fn process(&self, block: ChainBlock, native_price: f64) -> Result<Option<BlockSummary>> {
        let Some(_claim) = self.claim(block.number) else {
            debug!(block = block.number, "Block already in flight");
            return Ok(None);
        };
        if self.is_processed(block.number).await? {
            self.sync_state.write().await.record_skip();
            indexer_metrics::counters::blocks_skipped(1);
            return Ok(None);
        }

        let start = Instant::now();
        let now = now_secs();
        let recent = now.saturating_sub(block.timestamp) < self.config.max_swap_age_secs;

        let decoded = DecodedBlock::decode(&block);
        if decoded.unrecognized > 0 {
            indexer_metrics::counters::decode_skipped(decoded.unrecognized as u64, "unrecognized");
        }

        let pairs_created = self.handle_pairs_created(&block, &decoded.pairs_created).await?;
        let liquidity_events = self
            .handle_liquidity(&block, &decoded.liquidity, native_price)
            .await?;
        let (mut transfers, tokens) = self.decode_transfers(&block, &decoded.transfers).await;
        let (mut swaps, swapped_pairs) = self
            .decode_swaps(&block, &decoded.swaps, native_price, recent)
            .await;

        self.attribute(&mut swaps, &transfers, &swapped_pairs, &decoded.log_counts);

        let write_start = Instant::now();
        self.deadlines
            .storage("insert_swaps", self.storage.events.insert_swaps(&swaps))
            .await?;
        indexer_metrics::histograms::db_write_duration(write_start.elapsed(), "swaps");

        classify_transfers(&mut transfers, &swaps, |token| {
            tokens.get(token).map(|t| t.price_usd).unwrap_or_default()
        });
        let write_start = Instant::now();
        self.deadlines
            .storage("insert_transfers", self.storage.events.insert_transfers(&transfers))
            .await?;
        indexer_metrics::histograms::db_write_duration(write_start.elapsed(), "transfers");

        if recent {
            self.update_pair_stats(&swapped_pairs, native_price, now).await;
            self.update_token_prices(&swaps).await;
        }

        let volume_usd: f64 = swaps.iter().map(|s| s.volume_usd).sum();
        let record = BlockRecord {
            number: block.number,
            hash: block.hash,
            timestamp: block.timestamp,
            tx_num: swaps.len() as u64,
            volume_usd,
            native_price,
        };
        let newly_marked = self
            .deadlines
            .storage("mark_processed", self.storage.ledger.mark_processed(&record))
            .await?;

        let summary = BlockSummary {
            number: block.number,
            pairs_created,
            swaps: swaps.len(),
            transfers: transfers.len(),
            liquidity_events,
            unrecognized_logs: decoded.unrecognized,
            volume_usd,
            newly_marked,
        };
        self.record(&summary, start).await;
        Ok(Some(summary))
    }

    async fn record(&self, summary: &BlockSummary, start: Instant) {
        {
            let mut state = self.sync_state.write().await;
            state.record_block(summary.number);
            state.record_events(
                summary.swaps as u64,
                summary.transfers as u64,
                summary.liquidity_events as u64,
            );
            state.record_pairs(summary.pairs_created as u64);
            indexer_metrics::gauges::set_last_processed_block(state.last_processed_block);
        }

        let elapsed = start.elapsed();
        indexer_metrics::counters::blocks_processed(1);
        indexer_metrics::counters::swaps_indexed(summary.swaps as u64);
        indexer_metrics::counters::transfers_indexed(summary.transfers as u64);
        indexer_metrics::counters::liquidity_events_indexed(summary.liquidity_events as u64);
        indexer_metrics::counters::pairs_discovered(summary.pairs_created as u64);
        indexer_metrics::histograms::block_processing_duration(elapsed);
        indexer_metrics::gauges::set_cache_pairs(self.cache.pair_count());

        debug!(
            block = summary.number,
            swaps = summary.swaps,
            transfers = summary.transfers,
            liquidity = summary.liquidity_events,
            pairs = summary.pairs_created,
            volume_usd = summary.volume_usd,
            elapsed_ms = elapsed.as_millis(),
            "Block processed"
        );
    }

    async fn handle_pairs_created(
        &self,
        block: &ChainBlock,
        created: &[Located<PairCreatedLog>],
    ) -> Result<usize> {
        for located in created {
            let event = &located.event;
            let mut pair = Pair::new(event.pair, event.token0, event.token1, event.variant);
            pair.fee = event.fee;
            pair.created_block = block.number;
            pair.created_tx = located.key.tx_hash;
            pair.created_at = block.timestamp;
            self.resolver.describe_pair(&mut pair).await;

            self.deadlines
                .storage("save_pair", self.storage.pairs.save_pair(&pair))
                .await?;

            info!(
                block = block.number,
                tx_hash = ?located.key.tx_hash,
                pair = ?pair.address,
                name = %pair.name,
                fee = pair.fee,
                "Pair created"
            );
        }
        Ok(created.len())
    }

    async fn handle_liquidity(
        &self,
        block: &ChainBlock,
        logs: &[Located<LiquidityLog>],
        native_price: f64,
    ) -> Result<usize> {
        let mut touched: HashMap<Address, Pair> = HashMap::new();
        let mut events = Vec::with_capacity(logs.len());

        for located in logs {
            let log = &located.event;
            let pair = match touched.get(&log.pair) {
                Some(pair) => pair.clone(),
                None => match self.resolver.fresh_pair(log.pair, log.variant).await {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(
                            block = block.number,
                            tx_hash = ?located.key.tx_hash,
                            pair = ?log.pair,
                            error = %e,
                            "Skipping liquidity event on unreadable pair"
                        );
                        indexer_metrics::counters::decode_skipped(1, "pair_unavailable");
                        continue;
                    }
                },
            };

            let event = LiquidityEvent {
                key: located.key,
                pair: pair.address,
                variant: log.variant,
                direction: log.direction,
                token0: pair.token0,
                token1: pair.token1,
                amount0: log.amount0,
                amount1: log.amount1,
                value_usd: liquidity_event_usd(&pair, log.amount0, log.amount1, &self.quotes, native_price),
                operator: located.operator,
                block_number: block.number,
                block_time: block.timestamp,
                gas_price: located.gas_price,
            };

            let mut pair = pair;
            if event.is_add() {
                let first = FirstLiquidity {
                    block_number: block.number,
                    timestamp: block.timestamp,
                    tx_hash: located.key.tx_hash,
                    gas_price: located.gas_price,
                };
                if pair.observe_first_add(first) {
                    if let Err(e) = self
                        .deadlines
                        .storage(
                            "update_first_liquidity",
                            self.storage.pairs.update_first_liquidity(pair.address, &first),
                        )
                        .await
                    {
                        warn!(block = block.number, pair = ?pair.address, error = %e, "Failed to record first liquidity");
                    }
                }
            }

            touched.insert(pair.address, pair);
            events.push(event);
        }

        if events.is_empty() {
            return Ok(0);
        }

        let write_start = Instant::now();
        self.deadlines
            .storage(
                "insert_liquidity_events",
                self.storage.events.insert_liquidity_events(&events),
            )
            .await?;
        indexer_metrics::histograms::db_write_duration(write_start.elapsed(), "liquidity_events");

        for pair in touched.values() {
            self.refresh_pool_liquidity(pair, native_price).await;
        }

        Ok(events.len())
    }

    /// Decimal-adjust every transfer; tokens are resolved once per block
    async fn decode_transfers(
        &self,
        block: &ChainBlock,
        logs: &[Located<TransferLog>],
    ) -> (Vec<Transfer>, HashMap<Address, Token>) {
        let distinct: HashSet<Address> = logs.iter().map(|l| l.event.token).collect();
        let tokens: HashMap<Address, Token> = stream::iter(distinct)
            .map(|address| async move { (address, self.resolver.token(address).await) })
            .buffer_unordered(TOKEN_CONCURRENCY)
            .filter_map(|(address, token)| async move {
                match token {
                    Ok(token) => Some((address, token)),
                    Err(e) => {
                        debug!(block = block.number, token = ?address, error = %e, "Transfer token unresolved");
                        None
                    }
                }
            })
            .collect()
            .await;

        let transfers = logs
            .iter()
            .map(|located| {
                let log = &located.event;
                let amount = tokens
                    .get(&log.token)
                    .map(|t| transfer_amount(log.value, t.decimals))
                    .unwrap_or_default();
                Transfer {
                    key: located.key,
                    token: log.token,
                    from: log.from,
                    to: log.to,
                    raw_amount: log.value,
                    amount,
                    value_usd: 0.0,
                    kind: Default::default(),
                    block_number: block.number,
                    block_time: block.timestamp,
                    operator: located.operator,
                }
            })
            .collect();

        (transfers, tokens)
    }

    /// Price every swap and feed recent ones to the candles
    async fn decode_swaps(
        &self,
        block: &ChainBlock,
        logs: &[Located<SwapLog>],
        native_price: f64,
        recent: bool,
    ) -> (Vec<Swap>, HashMap<Address, Pair>) {
        let mut pairs: HashMap<Address, Pair> = HashMap::new();
        let mut swaps = Vec::with_capacity(logs.len());

        for located in logs {
            let log = &located.event;
            let pair = match pairs.get(&log.pair) {
                Some(pair) => pair.clone(),
                None => match self.resolver.pair(log.pair, log.variant).await {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(
                            block = block.number,
                            tx_hash = ?located.key.tx_hash,
                            pair = ?log.pair,
                            error = %e,
                            "Skipping swap on unreadable pair"
                        );
                        indexer_metrics::counters::decode_skipped(1, "pair_unavailable");
                        continue;
                    }
                },
            };

            let swap = self.build_swap(block, located, &pair, native_price).await;
            if swap.direction == Direction::Unknown {
                debug!(
                    block = block.number,
                    tx_hash = ?located.key.tx_hash,
                    pair = ?pair.address,
                    "Swap amounts do not form a one-way trade, stored unpriced"
                );
            }

            if recent {
                let trade = KlineTrade::from(&swap);
                let updated = self
                    .deadlines
                    .storage("kline_update", async {
                        self.klines.update(&trade).await.map_err(IndexerError::from)
                    })
                    .await;
                if let Err(e) = updated {
                    warn!(block = block.number, pair = ?pair.address, error = %e, "Failed to update klines");
                }
            }

            pairs.insert(pair.address, pair);
            swaps.push(swap);
        }

        (swaps, pairs)
    }

    async fn build_swap(
        &self,
        block: &ChainBlock,
        located: &Located<SwapLog>,
        pair: &Pair,
        native_price: f64,
    ) -> Swap {
        let log = &located.event;
        let main = main_token(pair.token0, pair.token1, &self.quotes);
        let quote = pair.other_token(&main);
        let pricing = log
            .amounts
            .price(main == pair.token0, pair.decimals0, pair.decimals1);

        let (main_amount, price, direction) = match pricing {
            Some(p) => (p.main_amount, p.price, p.direction),
            None => (0.0, 0.0, Direction::Unknown),
        };
        let price_usd = if unit_usd(&quote, &self.quotes, native_price) > 0.0 {
            swap_price_usd(price, &quote, &self.quotes, native_price)
        } else {
            // neither side is a quote asset, reuse the main token's last fiat price
            match self.resolver.token(main).await {
                Ok(token) => token.price_usd,
                Err(e) => {
                    debug!(
                        block = block.number,
                        tx_hash = ?located.key.tx_hash,
                        token = ?main,
                        error = %e,
                        "No stored fiat price for main token"
                    );
                    0.0
                }
            }
        };
        let (amount0_in, amount1_in, amount0_out, amount1_out) = log.amounts.in_out();

        Swap {
            key: located.key,
            pair: pair.address,
            block_number: block.number,
            block_time: block.timestamp,
            variant: log.variant,
            token0: pair.token0,
            token1: pair.token1,
            amount0_in,
            amount1_in,
            amount0_out,
            amount1_out,
            main_token: main,
            main_amount,
            price,
            price_usd,
            volume_usd: main_amount * price_usd,
            direction,
            sender: log.sender,
            recipient: log.recipient,
            operator: located.operator,
            trader: None,
            gas_price: located.gas_price,
        }
    }

    /// Register the block's pairs and main tokens as swap contracts, then
    /// attribute traders, all under the cache lock
    fn attribute(
        &self,
        swaps: &mut [Swap],
        transfers: &[Transfer],
        pairs: &HashMap<Address, Pair>,
        log_counts: &HashMap<B256, usize>,
    ) {
        let max_logs = self.config.log_num_too_big_in_one_tx;
        let outcomes = self.cache.with(|state| {
            for pair in pairs.values() {
                state.insert_pair(pair.clone());
            }
            for swap in swaps.iter() {
                state.add_swap_contract(swap.main_token);
            }
            attribute_block(swaps, transfers, log_counts, max_logs, |address| {
                state.is_swap_contract(address)
            })
        });

        for outcome in outcomes {
            indexer_metrics::counters::attribution(outcome.as_label());
        }
    }

    /// Rolling statistics, pool liquidity and hack classification of every
    /// pair traded in the block; failures are logged per pair
    async fn update_pair_stats(&self, pairs: &HashMap<Address, Pair>, native_price: f64, now: u64) {
        for (address, cached) in pairs {
            let mut pair = match self
                .deadlines
                .storage("load_pair", self.storage.pairs.pair(*address))
                .await
            {
                Ok(Some(pair)) => pair,
                Ok(None) => cached.clone(),
                Err(e) => {
                    warn!(pair = ?address, error = %e, "Failed to load pair for stats");
                    continue;
                }
            };

            let minutes = self.klines.range(*address, KlinePeriod::Minute, now, MINUTE_CANDLES);
            let hours = self.klines.range(*address, KlinePeriod::Hour, now, HOUR_CANDLES);
            let (minutes, hours) = match (minutes.await, hours.await) {
                (Ok(minutes), Ok(hours)) => (minutes, hours),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(pair = ?address, error = %e, "Failed to read klines for stats");
                    continue;
                }
            };

            pair.stats = trade_stats::compute(&pair.stats, &minutes, &hours, now);
            if let Err(e) = self
                .deadlines
                .storage(
                    "update_trade_stats",
                    self.storage.pairs.update_trade_stats(*address, &pair.stats),
                )
                .await
            {
                warn!(pair = ?address, error = %e, "Failed to update trade stats");
                continue;
            }

            self.refresh_pool_liquidity(&pair, native_price).await;

            if let (HackType::Uninit, Some(checker)) = (pair.hack_type, self.hack_checker) {
                pair.hack_type = self.resolver.classify_hack(&pair, checker).await;
                if let Err(e) = self
                    .deadlines
                    .storage(
                        "update_hack_type",
                        self.storage.pairs.update_hack_type(*address, pair.hack_type),
                    )
                    .await
                {
                    warn!(pair = ?address, error = %e, "Failed to update hack type");
                }
            }

            self.cache.insert_pair(pair);
        }
    }

    /// Read both pool balances and store their fiat value
    async fn refresh_pool_liquidity(&self, pair: &Pair, native_price: f64) {
        let balance0 = self
            .deadlines
            .rpc("balanceOf", self.client.balance_of(pair.token0, pair.address));
        let balance1 = self
            .deadlines
            .rpc("balanceOf", self.client.balance_of(pair.token1, pair.address));

        let (balance0, balance1) = match futures::try_join!(balance0, balance1) {
            Ok(balances) => balances,
            Err(e) => {
                warn!(pair = ?pair.address, error = %e, "Failed to read pool balances");
                return;
            }
        };

        let liquidity = pool_liquidity(pair, balance0, balance1, &self.quotes, native_price);
        if let Err(e) = self
            .deadlines
            .storage(
                "update_liquidity",
                self.storage.pairs.update_liquidity(pair.address, &liquidity),
            )
            .await
        {
            warn!(pair = ?pair.address, error = %e, "Failed to update pool liquidity");
        }
    }

    /// Persist the last positive fiat price of each main token traded
    async fn update_token_prices(&self, swaps: &[Swap]) {
        let mut prices: HashMap<Address, f64> = HashMap::new();
        for swap in swaps {
            prices.insert(swap.main_token, swap.price_usd);
        }

        for (token, price_usd) in prices {
            if price_usd <= 0.0 {
                continue;
            }
            match self
                .deadlines
                .storage(
                    "update_token_price",
                    self.storage.pairs.update_token_price(token, price_usd),
                )
                .await
            {
                Ok(()) => {
                    self.cache.set_token_price(&token, price_usd);
                }
                Err(e) => warn!(token = ?token, error = %e, "Failed to update token price"),
            }
        }
    }
}

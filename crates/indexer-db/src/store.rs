use alloy_primitives::Address;
use async_trait::async_trait;
use indexer_candles::{CandleError, KlineBucket, KlinePeriod, KlineStore};
use indexer_core::types::{
    BlockRecord, FirstLiquidity, HackType, LiquidityEvent, Pair, PoolLiquidity, Swap, Token,
    TradeStats, Transfer,
};
use indexer_core::{BlockLedger, EventRepository, IndexerError, PairRepository};
use sqlx::PgPool;
use std::time::Instant;
use tracing::debug;

use crate::models::{
    hex, to_i64, DbBlock, DbKlineBucket, DbLiquidityEvent, DbPair, DbSwap, DbToken, DbTransfer,
};
use crate::pool::DatabasePool;
use crate::repositories::{
    BlockRepository, KlineRepository, LiquidityRepository, PoolRepository, TokenRepository,
    TradeRepository, TransferRepository,
};

type CoreResult<T> = indexer_core::Result<T>;

/// PostgreSQL backend for every storage trait the processor writes through
#[derive(Clone)]
pub struct PgStore {
    db: DatabasePool,
}

impl PgStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn pool(&self) -> &PgPool {
        self.db.inner()
    }

    /// Latest processed block in the ledger
    pub async fn latest_block(&self) -> CoreResult<Option<u64>> {
        let latest = BlockRepository::latest(self.pool()).await?;
        Ok(latest.and_then(|n| u64::try_from(n).ok()))
    }

    /// Ledger row of one block
    pub async fn block(&self, number: u64) -> CoreResult<Option<BlockRecord>> {
        match BlockRepository::get(self.pool(), to_i64(number)).await? {
            Some(row) => Ok(Some(row.into_record()?)),
            None => Ok(None),
        }
    }

    fn require_pair(found: bool, address: Address) -> CoreResult<()> {
        if found {
            Ok(())
        } else {
            Err(IndexerError::PairNotFound(address))
        }
    }
}

#[async_trait]
impl BlockLedger for PgStore {
    async fn is_processed(&self, number: u64) -> CoreResult<bool> {
        Ok(BlockRepository::exists(self.pool(), to_i64(number)).await?)
    }

    async fn mark_processed(&self, record: &BlockRecord) -> CoreResult<bool> {
        let inserted = BlockRepository::insert(self.pool(), &DbBlock::from(record)).await?;
        debug!(block = record.number, inserted, "Block marked processed");
        Ok(inserted)
    }

    async fn unmark(&self, number: u64) -> CoreResult<()> {
        Ok(BlockRepository::delete(self.pool(), to_i64(number)).await?)
    }
}

#[async_trait]
impl PairRepository for PgStore {
    async fn pair(&self, address: Address) -> CoreResult<Option<Pair>> {
        match PoolRepository::get(self.pool(), &hex(&address)).await? {
            Some(row) => Ok(Some(row.into_pair()?)),
            None => Ok(None),
        }
    }

    async fn all_pairs(&self) -> CoreResult<Vec<Pair>> {
        let rows = PoolRepository::get_all(self.pool()).await?;
        let pairs = rows
            .into_iter()
            .map(DbPair::into_pair)
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(pairs)
    }

    async fn save_pair(&self, pair: &Pair) -> CoreResult<()> {
        Ok(PoolRepository::upsert(self.pool(), &DbPair::from(pair)).await?)
    }

    async fn token(&self, address: Address) -> CoreResult<Option<Token>> {
        match TokenRepository::get(self.pool(), &hex(&address)).await? {
            Some(row) => Ok(Some(row.into_token()?)),
            None => Ok(None),
        }
    }

    async fn save_token(&self, token: &Token) -> CoreResult<()> {
        Ok(TokenRepository::upsert(self.pool(), &DbToken::from(token)).await?)
    }

    async fn update_token_price(&self, address: Address, price_usd: f64) -> CoreResult<()> {
        Ok(TokenRepository::update_price(self.pool(), &hex(&address), price_usd).await?)
    }

    async fn update_trade_stats(&self, address: Address, stats: &TradeStats) -> CoreResult<()> {
        let found = PoolRepository::update_stats(self.pool(), &hex(&address), stats).await?;
        Self::require_pair(found, address)
    }

    async fn update_liquidity(&self, address: Address, liquidity: &PoolLiquidity) -> CoreResult<()> {
        let found = PoolRepository::update_liquidity(
            self.pool(),
            &hex(&address),
            liquidity.token0_usd,
            liquidity.token1_usd,
            liquidity.total_usd,
        )
        .await?;
        Self::require_pair(found, address)
    }

    async fn update_first_liquidity(
        &self,
        address: Address,
        first: &FirstLiquidity,
    ) -> CoreResult<()> {
        PoolRepository::update_first_liquidity(
            self.pool(),
            &hex(&address),
            to_i64(first.block_number),
            to_i64(first.timestamp),
            &hex(&first.tx_hash),
            &first.gas_price.to_string(),
        )
        .await?;
        Ok(())
    }

    async fn update_hack_type(&self, address: Address, hack_type: HackType) -> CoreResult<()> {
        let found =
            PoolRepository::update_hack_type(self.pool(), &hex(&address), hack_type.as_i16())
                .await?;
        Self::require_pair(found, address)
    }
}

#[async_trait]
impl EventRepository for PgStore {
    async fn insert_swaps(&self, swaps: &[Swap]) -> CoreResult<u64> {
        let start = Instant::now();
        let rows: Vec<DbSwap> = swaps.iter().map(DbSwap::from).collect();
        let inserted = TradeRepository::bulk_insert(self.pool(), &rows).await?;
        debug!(rows = rows.len(), inserted, elapsed_ms = start.elapsed().as_millis(), "Swaps written");
        Ok(inserted)
    }

    async fn insert_transfers(&self, transfers: &[Transfer]) -> CoreResult<u64> {
        let rows: Vec<DbTransfer> = transfers.iter().map(DbTransfer::from).collect();
        Ok(TransferRepository::bulk_insert(self.pool(), &rows).await?)
    }

    async fn insert_liquidity_events(&self, events: &[LiquidityEvent]) -> CoreResult<u64> {
        let rows: Vec<DbLiquidityEvent> = events.iter().map(DbLiquidityEvent::from).collect();
        Ok(LiquidityRepository::bulk_insert(self.pool(), &rows).await?)
    }
}

#[async_trait]
impl KlineStore for PgStore {
    async fn load_bucket(
        &self,
        period: KlinePeriod,
        key: &str,
    ) -> indexer_candles::Result<Option<KlineBucket>> {
        match KlineRepository::get(self.pool(), period, key).await? {
            Some(row) => Ok(Some(row.into_bucket()?)),
            None => Ok(None),
        }
    }

    async fn save_bucket(&self, period: KlinePeriod, bucket: &KlineBucket) -> indexer_candles::Result<()> {
        KlineRepository::upsert(self.pool(), period, &DbKlineBucket::from(bucket)).await?;
        Ok(())
    }

    async fn buckets_in_range(
        &self,
        period: KlinePeriod,
        pair: Address,
        start: u64,
        end: u64,
    ) -> indexer_candles::Result<Vec<KlineBucket>> {
        let rows = KlineRepository::get_by_pair_range(
            self.pool(),
            period,
            &hex(&pair),
            to_i64(start),
            to_i64(end),
        )
        .await?;
        rows.into_iter()
            .map(|row| row.into_bucket().map_err(CandleError::from))
            .collect()
    }
}

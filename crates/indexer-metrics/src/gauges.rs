use metrics::{describe_gauge, gauge};

/// Initialize gauge descriptions
pub fn init() {
    describe_gauge!("indexer_head_block", "Latest chain head seen");
    describe_gauge!(
        "indexer_last_processed_block",
        "Highest block number marked processed"
    );
    describe_gauge!(
        "indexer_backfill_in_flight",
        "Backfill blocks currently holding a permit"
    );
    describe_gauge!("indexer_native_price", "Native asset fiat price in use");
    describe_gauge!("indexer_cache_pairs", "Number of pairs in the shared cache");
    describe_gauge!("indexer_db_connections", "Number of database connections");
}

pub fn set_head_block(block: u64) {
    gauge!("indexer_head_block").set(block as f64);
}

pub fn set_last_processed_block(block: u64) {
    gauge!("indexer_last_processed_block").set(block as f64);
}

pub fn set_backfill_in_flight(count: usize) {
    gauge!("indexer_backfill_in_flight").set(count as f64);
}

pub fn set_native_price(price: f64) {
    gauge!("indexer_native_price").set(price);
}

pub fn set_cache_pairs(count: usize) {
    gauge!("indexer_cache_pairs").set(count as f64);
}

/// Set database connections gauge
pub fn set_db_connections(count: u32) {
    gauge!("indexer_db_connections").set(count as f64);
}

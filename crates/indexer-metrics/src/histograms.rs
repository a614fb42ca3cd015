use metrics::{describe_histogram, histogram};
use std::time::Duration;

/// Initialize histogram descriptions
pub fn init() {
    describe_histogram!(
        "indexer_block_fetch_duration_seconds",
        "Time to fetch a block and its receipts"
    );
    describe_histogram!(
        "indexer_block_processing_duration_seconds",
        "Time to decode, attribute, persist and aggregate one block"
    );
    describe_histogram!(
        "indexer_db_write_duration_seconds",
        "Time for database write operations"
    );
    describe_histogram!(
        "indexer_rpc_request_duration_seconds",
        "Time for RPC requests"
    );
}

pub fn block_fetch_duration(duration: Duration) {
    histogram!("indexer_block_fetch_duration_seconds").record(duration.as_secs_f64());
}

pub fn block_processing_duration(duration: Duration) {
    histogram!("indexer_block_processing_duration_seconds").record(duration.as_secs_f64());
}

/// Record database write duration
pub fn db_write_duration(duration: Duration, table: &str) {
    histogram!("indexer_db_write_duration_seconds", "table" => table.to_string())
        .record(duration.as_secs_f64());
}

/// Record RPC request duration
pub fn rpc_request_duration(duration: Duration, method: &str) {
    histogram!("indexer_rpc_request_duration_seconds", "method" => method.to_string())
        .record(duration.as_secs_f64());
}

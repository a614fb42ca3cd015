use metrics::{counter, describe_counter};

/// Initialize counter descriptions
pub fn init() {
    describe_counter!(
        "indexer_blocks_processed_total",
        "Total number of blocks processed and marked in the ledger"
    );
    describe_counter!(
        "indexer_blocks_skipped_total",
        "Blocks skipped because the ledger already had them"
    );
    describe_counter!(
        "indexer_blocks_dropped_total",
        "Blocks abandoned after a fetch or price failure"
    );
    describe_counter!("indexer_swaps_total", "Total number of swaps indexed");
    describe_counter!("indexer_transfers_total", "Total number of transfers indexed");
    describe_counter!(
        "indexer_liquidity_events_total",
        "Total number of liquidity events indexed"
    );
    describe_counter!("indexer_pairs_total", "Total number of pairs discovered");
    describe_counter!(
        "indexer_attribution_total",
        "Trader attribution outcomes by result"
    );
    describe_counter!(
        "indexer_decode_skipped_total",
        "Logs or swaps dropped during decoding"
    );
    describe_counter!("indexer_errors_total", "Total number of errors");
}

pub fn blocks_processed(count: u64) {
    counter!("indexer_blocks_processed_total").increment(count);
}

pub fn blocks_skipped(count: u64) {
    counter!("indexer_blocks_skipped_total").increment(count);
}

/// Increment dropped blocks, labelled by the failing stage
pub fn blocks_dropped(count: u64, stage: &str) {
    counter!("indexer_blocks_dropped_total", "stage" => stage.to_string()).increment(count);
}

pub fn swaps_indexed(count: u64) {
    counter!("indexer_swaps_total").increment(count);
}

pub fn transfers_indexed(count: u64) {
    counter!("indexer_transfers_total").increment(count);
}

pub fn liquidity_events_indexed(count: u64) {
    counter!("indexer_liquidity_events_total").increment(count);
}

pub fn pairs_discovered(count: u64) {
    counter!("indexer_pairs_total").increment(count);
}

/// Outcome is one of `trader`, `none`, `arbitrage`, `too_complicated`
pub fn attribution(outcome: &str) {
    counter!("indexer_attribution_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn decode_skipped(count: u64, reason: &str) {
    counter!("indexer_decode_skipped_total", "reason" => reason.to_string()).increment(count);
}

/// Increment errors counter
pub fn errors(count: u64, error_type: &str) {
    counter!("indexer_errors_total", "type" => error_type.to_string()).increment(count);
}

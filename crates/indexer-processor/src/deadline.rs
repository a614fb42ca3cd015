use indexer_core::{with_timeout, ProcessorConfig, Result};
use std::future::Future;
use std::time::Instant;

/// Hard deadlines for chain reads and storage calls
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    pub rpc_secs: u64,
    pub storage_secs: u64,
}

impl Deadlines {
    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self {
            rpc_secs: config.rpc_timeout_secs,
            storage_secs: config.storage_timeout_secs,
        }
    }

    /// Bounded chain read, recorded under `method` in the RPC latency histogram
    pub async fn rpc<T, F>(&self, method: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = with_timeout(self.rpc_secs, method, fut).await;
        indexer_metrics::histograms::rpc_request_duration(start.elapsed(), method);
        result
    }

    pub async fn storage<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_timeout(self.storage_secs, operation, fut).await
    }
}

impl Default for Deadlines {
    fn default() -> Self {
        Self::from_config(&ProcessorConfig::default())
    }
}

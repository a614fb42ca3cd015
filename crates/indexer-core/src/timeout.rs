use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{IndexerError, Result};

/// Bound an operation by a hard deadline, surfacing expiry as a recoverable error
pub async fn with_timeout<T, F>(secs: u64, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, secs, "Operation timed out");
            Err(IndexerError::Timeout {
                operation: operation.to_string(),
                secs,
            })
        }
    }
}

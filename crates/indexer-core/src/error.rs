use alloy_primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Deployment file not found: {0}")]
    DeploymentFileNotFound(String),

    #[error("Failed to parse deployment file: {0}")]
    DeploymentParseError(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Timed out after {secs}s: {operation}")]
    Timeout { operation: String, secs: u64 },

    #[error("Event decode error: {0}")]
    EventDecode(String),

    #[error("Pair not found: {0}")]
    PairNotFound(Address),

    #[error("Token metadata unavailable: {0}")]
    TokenNotFound(Address),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexerError {
    /// Whether the failure is worth retrying on the next sweep
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IndexerError::Rpc(_)
                | IndexerError::WebSocket(_)
                | IndexerError::Timeout { .. }
                | IndexerError::Storage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(IndexerError::Rpc("connection reset".into()).is_transient());
        assert!(IndexerError::Timeout {
            operation: "eth_getBlockByNumber".into(),
            secs: 5
        }
        .is_transient());
        assert!(!IndexerError::EventDecode("short data".into()).is_transient());
        assert!(!IndexerError::PairNotFound(Address::ZERO).is_transient());
    }
}

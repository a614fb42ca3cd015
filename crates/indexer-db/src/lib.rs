//! PostgreSQL storage backend.

pub mod config;
pub mod models;
pub mod pool;
pub mod repositories;
pub mod retention;
pub mod store;

pub use config::DatabaseConfig;
pub use pool::DatabasePool;
pub use retention::{RetentionPolicy, RetentionTask};
pub use store::PgStore;

use indexer_candles::CandleError;
use indexer_core::IndexerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::Query(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::Migration(err.to_string())
    }
}

impl From<DatabaseError> for IndexerError {
    fn from(err: DatabaseError) -> Self {
        IndexerError::Storage(err.to_string())
    }
}

impl From<DatabaseError> for CandleError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Serialization(msg) => CandleError::Serialization(msg),
            other => CandleError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod storage;
pub mod timeout;
pub mod types;

pub use client::{ChainClient, HackProbe, PriceOracle};
pub use config::{Chain, DeploymentConfig, IndexerConfig, ProcessorConfig, QuoteAssets, SyncConfig};
pub use error::{IndexerError, Result};
pub use storage::{BlockLedger, EventRepository, PairRepository};
pub use timeout::with_timeout;

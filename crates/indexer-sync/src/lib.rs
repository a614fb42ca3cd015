//! Chain access and block scheduling: the alloy providers, the native price
//! oracle, the backfill and live schedulers and the engine tying them together.

mod engine;
mod oracle;
mod provider;
mod scheduler;

pub use engine::SyncEngine;
pub use oracle::{price_from_reserves, price_from_sqrt_x96, NativePriceOracle};
pub use provider::ProviderManager;
pub use scheduler::{BackfillReport, BlockPipeline, BlockScheduler, HeadSource, HeadStream};

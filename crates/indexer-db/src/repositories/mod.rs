mod block;
mod kline;
mod liquidity;
mod pool;
mod token;
mod trade;
mod transfer;

pub use block::BlockRepository;
pub use kline::KlineRepository;
pub use liquidity::LiquidityRepository;
pub use pool::PoolRepository;
pub use token::TokenRepository;
pub use trade::TradeRepository;
pub use transfer::TransferRepository;

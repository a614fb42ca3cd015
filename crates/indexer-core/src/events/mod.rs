pub mod erc20;
pub mod uniswap_v2;
pub mod uniswap_v3;

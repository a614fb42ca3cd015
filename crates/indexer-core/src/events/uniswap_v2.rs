use alloy_sol_types::sol;

sol! {
    /// Emitted by the factory when a pair is deployed
    #[derive(Debug)]
    event PairCreated(
        address indexed token0,
        address indexed token1,
        address pair,
        uint256 allPairsLength
    );

    /// Constant-product swap: four unsigned in/out amounts
    #[derive(Debug)]
    event Swap(
        address indexed sender,
        uint256 amount0In,
        uint256 amount1In,
        uint256 amount0Out,
        uint256 amount1Out,
        address indexed to
    );

    #[derive(Debug)]
    event Mint(address indexed sender, uint256 amount0, uint256 amount1);

    #[derive(Debug)]
    event Burn(address indexed sender, uint256 amount0, uint256 amount1, address indexed to);
}

/// Fee tier recorded for constant-product pairs (0.3%)
pub const V2_FEE: u32 = 3000;

use alloy_sol_types::sol;

sol! {
    /// ERC-20 balance movement
    #[derive(Debug)]
    event Transfer(address indexed from, address indexed to, uint256 value);
}

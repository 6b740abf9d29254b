use ethers::prelude::abigen;

abigen!(
    IUniswapV2Pair,
    r#"[
        event Mint(address indexed sender, uint256 amount0, uint256 amount1)
        event Burn(address indexed sender, uint256 amount0, uint256 amount1, address indexed to)
        event Swap(address indexed sender, uint256 amount0In, uint256 amount1In, uint256 amount0Out, uint256 amount1Out, address indexed to)
        event Sync(uint112 reserve0, uint112 reserve1)
        event Transfer(address indexed from, address indexed to, uint256 value)
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast)
        function token0() external view returns (address)
        function token1() external view returns (address)
    ]"#
);

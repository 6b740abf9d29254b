use ethers::prelude::abigen;

abigen!(
    IUniswapV2Factory,
    r#"[
        event PairCreated(address indexed token0, address indexed token1, address pair, uint256)
        function allPairsLength() external view returns (uint256)
        function allPairs(uint256) external view returns (address pair)
        function getPair(address tokenA, address tokenB) external view returns (address pair)
    ]"#
);

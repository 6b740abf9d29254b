// Contracts Module - Public ABIs Only

pub mod i_uniswap_v2_factory;
pub mod i_uniswap_v2_pair;

// Public exports
pub use i_uniswap_v2_factory::{IUniswapV2Factory, PairCreatedFilter};
pub use i_uniswap_v2_pair::{BurnFilter, IUniswapV2Pair, MintFilter, SwapFilter, SyncFilter, TransferFilter};

// Chain adapters
// Concrete implementations of the chain-client seams

pub mod uniswap_v2;
pub mod ws_client;

pub use uniswap_v2::UniswapV2FactoryRegistry;
pub use ws_client::WsChainClient;

// Re-export the traits
pub use crate::chain_client::{LogSource, PairRegistry};

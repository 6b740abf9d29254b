use async_trait::async_trait;
use ethers::prelude::*;
use std::sync::Arc;

use crate::chain_client::PairRegistry;
use crate::contracts::IUniswapV2Factory;
use crate::errors::ChainError;

/// `PairRegistry` backed by a UniswapV2-style factory (`allPairsLength` / `allPairs`).
///
/// The factory indexes `allPairs` from 0; pair ids are 1-based, so id `i` reads
/// `allPairs(i - 1)`.
pub struct UniswapV2FactoryRegistry<M> {
    factory_address: Address,
    factory: IUniswapV2Factory<M>,
}

impl<M: Middleware + 'static> UniswapV2FactoryRegistry<M> {
    pub fn new(factory_address: Address, client: Arc<M>) -> Self {
        Self {
            factory_address,
            factory: IUniswapV2Factory::new(factory_address, client),
        }
    }
}

fn registry_index(id: u64) -> Result<U256, ChainError> {
    if id == 0 {
        return Err(ChainError::InvalidPairId(id));
    }
    Ok(U256::from(id - 1))
}

#[async_trait]
impl<M: Middleware + 'static> PairRegistry for UniswapV2FactoryRegistry<M> {
    fn factory(&self) -> Address {
        self.factory_address
    }

    async fn pair_count(&self) -> Result<u64, ChainError> {
        let length = self
            .factory
            .all_pairs_length()
            .call()
            .await
            .map_err(|e| ChainError::Call {
                method: "allPairsLength",
                reason: e.to_string(),
            })?;

        if length > U256::from(u64::MAX) {
            return Err(ChainError::PairCountOverflow(length.to_string()));
        }
        Ok(length.as_u64())
    }

    async fn pair_at(&self, id: u64) -> Result<Address, ChainError> {
        let index = registry_index(id)?;
        self.factory
            .all_pairs(index)
            .call()
            .await
            .map_err(|e| ChainError::Call {
                method: "allPairs",
                reason: format!("id {}: {}", id, e),
            })
    }
}

use std::fmt;

use ethers::types::Address;
use ethers::utils::to_checksum;

/// One resolved pair of the factory registry.
///
/// `id` is the 1-based position of the pair in the factory's `allPairs` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub id: u64,
    pub address: Address,
}

impl Pair {
    pub fn new(id: u64, address: Address) -> Self {
        Self { id, address }
    }

    /// EIP-55 checksummed hex rendering of the pair address.
    pub fn address_hex(&self) -> String {
        to_checksum(&self.address, None)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.address_hex())
    }
}

use ethers::types::Address;
use indexmap::IndexSet;
use log::warn;

use crate::pair_set::PairSet;

/// Deduplicated pair addresses, ordered by ascending pair id (first occurrence wins).
///
/// Built once after enumeration and used as the subscription filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressIndex {
    addresses: IndexSet<Address>,
}

impl AddressIndex {
    pub fn build(pairs: &PairSet) -> Self {
        let mut addresses = IndexSet::with_capacity(pairs.len());
        for pair in pairs.iter() {
            if !addresses.insert(pair.address) {
                warn!(
                    "⚠️ Pair {} resolves to an address already in the index, skipping",
                    pair
                );
            }
        }
        Self { addresses }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter()
    }

    pub fn to_vec(&self) -> Vec<Address> {
        self.addresses.iter().copied().collect()
    }
}

impl FromIterator<Address> for AddressIndex {
    fn from_iter<T: IntoIterator<Item = Address>>(iter: T) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}

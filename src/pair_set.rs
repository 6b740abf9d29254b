//! # Pair Aggregator
//!
//! Shared sink for resolved pairs during enumeration.
//!
//! The writer/reader phase split is enforced by ownership: workers hold cloned
//! [`PairSink`] handles that can only append, and the [`PairSet`] can only be taken out
//! with [`PairAggregator::finish`], which fails while any sink is still alive.

use ethers::types::Address;
use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::AggregatorError;
use crate::types::Pair;

#[derive(Debug, Default)]
struct Collected {
    pairs: BTreeMap<u64, Address>,
    failed: BTreeSet<u64>,
}

fn lock(inner: &Mutex<Collected>) -> MutexGuard<'_, Collected> {
    // A panicking writer cannot leave a half-written entry behind, so a poisoned
    // lock is still consistent.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owner of the collection while enumeration is running.
#[derive(Debug)]
pub struct PairAggregator {
    pair_count: u64,
    inner: Arc<Mutex<Collected>>,
}

impl PairAggregator {
    /// Aggregator for ids `1..=pair_count`.
    pub fn new(pair_count: u64) -> Self {
        Self {
            pair_count,
            inner: Arc::new(Mutex::new(Collected::default())),
        }
    }

    /// Append-only handle for one or more workers.
    pub fn sink(&self) -> PairSink {
        PairSink {
            pair_count: self.pair_count,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Ends the writer phase and hands out the collected pairs.
    ///
    /// # Errors
    ///
    /// `AggregatorError::WritersActive` if a [`PairSink`] has not been dropped yet, i.e.
    /// the wait-all barrier has not been passed.
    pub fn finish(self) -> Result<PairSet, AggregatorError> {
        let pair_count = self.pair_count;
        let inner = Arc::try_unwrap(self.inner)
            .map_err(|shared| AggregatorError::WritersActive(Arc::strong_count(&shared) - 1))?;
        let collected = inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        Ok(PairSet {
            pair_count,
            pairs: collected.pairs,
            failed: collected.failed,
        })
    }
}

/// Writer handle given to enumeration workers.
#[derive(Debug, Clone)]
pub struct PairSink {
    pair_count: u64,
    inner: Arc<Mutex<Collected>>,
}

impl PairSink {
    /// Records a resolved pair. Returns `false` (and keeps the first entry) if the id is
    /// outside `1..=pair_count` or was already recorded.
    pub fn append(&self, pair: Pair) -> bool {
        if pair.id == 0 || pair.id > self.pair_count {
            warn!(
                "⚠️ Ignoring pair {} outside registry range 1..={}",
                pair, self.pair_count
            );
            return false;
        }

        let mut collected = lock(&self.inner);
        if collected.pairs.contains_key(&pair.id) {
            warn!("⚠️ Ignoring duplicate result for pair id {}", pair.id);
            return false;
        }
        collected.failed.remove(&pair.id);
        collected.pairs.insert(pair.id, pair.address);
        true
    }

    /// Records an id whose lookup failed.
    pub fn record_failure(&self, id: u64) {
        let mut collected = lock(&self.inner);
        if !collected.pairs.contains_key(&id) {
            collected.failed.insert(id);
        }
    }
}

/// Pairs collected by one enumeration pass. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairSet {
    pair_count: u64,
    pairs: BTreeMap<u64, Address>,
    failed: BTreeSet<u64>,
}

impl PairSet {
    /// Number of pairs the factory reported.
    pub fn pair_count(&self) -> u64 {
        self.pair_count
    }

    /// Number of pairs actually resolved.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<Pair> {
        self.pairs.get(&id).map(|address| Pair::new(id, *address))
    }

    /// Pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = Pair> + '_ {
        self.pairs
            .iter()
            .map(|(id, address)| Pair::new(*id, *address))
    }

    /// Ids whose lookup failed, ascending.
    pub fn failed_ids(&self) -> Vec<u64> {
        self.failed.iter().copied().collect()
    }

    /// Ids in `1..=pair_count` with no resolved pair, ascending.
    pub fn missing_ids(&self) -> Vec<u64> {
        (1..=self.pair_count)
            .filter(|id| !self.pairs.contains_key(id))
            .collect()
    }
}

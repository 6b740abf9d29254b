//! In-memory chain doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{Address, Log};
use pair_monitor::chain_client::{LogSource, LogSubscription, PairRegistry, SubscriptionFeed};
use pair_monitor::errors::ChainError;
use pair_monitor::monitor::EventHandler;
use pair_monitor::types::LiquidityEvent;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn pair_address(id: u64) -> Address {
    Address::from_low_u64_be(0x1000 + id)
}

/// Factory with `count` pairs; ids in `failing` return an error.
pub struct MockRegistry {
    count: u64,
    failing: HashSet<u64>,
    delay: Duration,
    pub calls: AtomicU64,
    in_flight: AtomicUsize,
    pub high_water: AtomicUsize,
}

impl MockRegistry {
    pub fn new(count: u64) -> Self {
        Self {
            count,
            failing: HashSet::new(),
            delay: Duration::from_millis(1),
            calls: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self, ids: &[u64]) -> Self {
        self.failing = ids.iter().copied().collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PairRegistry for MockRegistry {
    fn factory(&self) -> Address {
        Address::from_low_u64_be(0xfac)
    }

    async fn pair_count(&self) -> Result<u64, ChainError> {
        Ok(self.count)
    }

    async fn pair_at(&self, id: u64) -> Result<Address, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(&id) {
            return Err(ChainError::Call {
                method: "allPairs",
                reason: format!("execution reverted for id {}", id),
            });
        }
        Ok(pair_address(id))
    }
}

/// Factory whose pair count cannot be read.
pub struct BrokenRegistry;

#[async_trait]
impl PairRegistry for BrokenRegistry {
    fn factory(&self) -> Address {
        Address::zero()
    }

    async fn pair_count(&self) -> Result<u64, ChainError> {
        Err(ChainError::Call {
            method: "allPairsLength",
            reason: "connection refused".to_string(),
        })
    }

    async fn pair_at(&self, id: u64) -> Result<Address, ChainError> {
        Err(ChainError::InvalidPairId(id))
    }
}

/// Log source that records each filter and hands the feed to the test.
#[derive(Default)]
pub struct MockLogSource {
    pub filters: Mutex<Vec<Vec<Address>>>,
    pub feeds: Mutex<Vec<SubscriptionFeed>>,
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn subscribe_logs(&self, addresses: &[Address]) -> Result<LogSubscription, ChainError> {
        let (feed, subscription) = LogSubscription::channel(64);
        self.filters.lock().unwrap().push(addresses.to_vec());
        self.feeds.lock().unwrap().push(feed);
        Ok(subscription)
    }
}

impl MockLogSource {
    /// Waits until a subscription has been opened and returns its feed.
    pub async fn next_feed(&self) -> SubscriptionFeed {
        loop {
            let feed = self.feeds.lock().unwrap().pop();
            if let Some(feed) = feed {
                return feed;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

pub fn log_from(address: Address) -> Log {
    Log {
        address,
        ..Default::default()
    }
}

#[derive(Default)]
pub struct RecordingHandler {
    pub events: Mutex<Vec<LiquidityEvent>>,
}

impl EventHandler for RecordingHandler {
    fn handle(&self, event: LiquidityEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RecordingHandler {
    pub fn addresses(&self) -> Vec<Address> {
        self.events.lock().unwrap().iter().map(|e| e.address).collect()
    }
}

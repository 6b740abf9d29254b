//! # Chain Client Seams
//!
//! The enumeration and monitoring phases only talk to the chain through the two traits
//! defined here:
//!
//! - [`PairRegistry`]: the factory binding (`pair_count` and `pair_at`)
//! - [`LogSource`]: opens a log subscription for a set of addresses
//!
//! The websocket implementation lives in `adapters::ws_client` and the UniswapV2 factory
//! binding in `adapters::uniswap_v2`. Tests plug in-memory implementations into the same
//! seams.

use async_trait::async_trait;
use ethers::types::{Address, Log};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::{ChainError, SubscriptionError};

/// Read access to a factory contract's pair registry.
///
/// Implementations must be safe to call concurrently from many workers.
#[async_trait]
pub trait PairRegistry: Send + Sync {
    /// Address of the factory contract being enumerated.
    fn factory(&self) -> Address;

    /// Number of pairs registered by the factory.
    async fn pair_count(&self) -> Result<u64, ChainError>;

    /// Address of the pair with the given 1-based id.
    async fn pair_at(&self, id: u64) -> Result<Address, ChainError>;
}

/// Opens live log subscriptions.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Subscribes to every log emitted by `addresses`.
    ///
    /// An error here means no subscription exists; transport problems after the
    /// subscription is open are delivered on [`LogSubscription::errors`] instead.
    async fn subscribe_logs(&self, addresses: &[Address]) -> Result<LogSubscription, ChainError>;
}

/// Sending half of a [`LogSubscription`], held by whoever produces the logs.
#[derive(Debug, Clone)]
pub struct SubscriptionFeed {
    pub logs: mpsc::Sender<Log>,
    pub errors: mpsc::Sender<SubscriptionError>,
}

/// A live subscription: a log channel plus an error channel.
///
/// Both channels closing means the subscription is exhausted. Dropping the subscription
/// stops the producer task, if one is attached.
#[derive(Debug)]
pub struct LogSubscription {
    pub logs: mpsc::Receiver<Log>,
    pub errors: mpsc::Receiver<SubscriptionError>,
    producer: Option<JoinHandle<()>>,
}

impl LogSubscription {
    /// Creates a subscription and the feed that drives it.
    pub fn channel(capacity: usize) -> (SubscriptionFeed, Self) {
        let capacity = capacity.max(1);
        let (logs_tx, logs_rx) = mpsc::channel(capacity);
        let (errors_tx, errors_rx) = mpsc::channel(capacity);
        (
            SubscriptionFeed {
                logs: logs_tx,
                errors: errors_tx,
            },
            Self {
                logs: logs_rx,
                errors: errors_rx,
                producer: None,
            },
        )
    }

    /// Ties the lifetime of `producer` to this subscription.
    pub fn with_producer(mut self, producer: JoinHandle<()>) -> Self {
        self.producer = Some(producer);
        self
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

//! Typed errors for the chain-client seam and the result aggregator.

use thiserror::Error;

/// Errors raised by the chain client and the factory binding.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("contract call {method} failed: {reason}")]
    Call { method: &'static str, reason: String },
    #[error("pair id {0} is outside the factory registry (ids start at 1)")]
    InvalidPairId(u64),
    #[error("pair count {0} does not fit in u64")]
    PairCountOverflow(String),
    #[error("failed to open log subscription: {0}")]
    Subscribe(String),
}

/// Non-fatal errors delivered on a subscription's error channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("subscription transport error: {0}")]
    Transport(String),
    #[error("subscription stream closed by the node")]
    Closed,
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("pair set read while {0} writer handle(s) are still alive")]
    WritersActive(usize),
}

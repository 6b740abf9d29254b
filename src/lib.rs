//! # Pair Monitor
//!
//! Enumerates every pair registered by a UniswapV2-style factory contract and then watches
//! all of them for liquidity-change events through a single live log subscription.
//!
//! ## Overview
//!
//! - **Enumeration**: reads `allPairsLength` and resolves `allPairs` for every id with a
//!   bounded number of concurrent calls; failed lookups are reported and skipped
//! - **Indexing**: the resolved pairs become a deduplicated address index
//! - **Monitoring**: one `eth_subscribe("logs")` over the whole index; transport errors
//!   are reported without stopping the loop
//!
//! ## Architecture
//!
//! ### Chain Seams
//! `chain_client` defines the `PairRegistry` and `LogSource` traits; `adapters` implements
//! them over a WebSocket provider and the UniswapV2 factory ABI.
//!
//! ### Enumeration Engine
//! `worker_pool` bounds concurrency and provides the wait-all barrier, `pair_set`
//! aggregates results, `enumeration` drives the pass.
//!
//! ### Monitoring
//! `address_index` builds the subscription filter, `monitor` multiplexes the event and
//! error channels.

// Core Types
/// Pair and liquidity event types
pub mod types;
/// Error types for the chain seams
pub mod errors;

// Chain Access
/// Traits for factory lookups and log subscriptions
pub mod chain_client;
/// WebSocket client and UniswapV2 factory adapter
pub mod adapters;
/// Contract ABIs (read-only)
pub mod contracts;

// Enumeration
/// Bounded worker pool with a wait-all barrier
pub mod worker_pool;
/// Concurrent pair aggregation
pub mod pair_set;
/// Factory enumeration pass
pub mod enumeration;

// Monitoring
/// Deduplicated address index
pub mod address_index;
/// Event subscription multiplexer
pub mod monitor;

/// Phase coordination
pub mod orchestrator;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use address_index::AddressIndex;
pub use chain_client::{LogSource, LogSubscription, PairRegistry};
pub use monitor::{EventHandler, EventMultiplexer};
pub use orchestrator::Orchestrator;
pub use pair_set::{PairAggregator, PairSet};
pub use settings::Settings;
pub use types::{LiquidityEvent, Pair};
pub use worker_pool::BoundedWorkerPool;

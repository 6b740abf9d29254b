//! # Pair Enumeration
//!
//! Reads the factory's pair count, then resolves every id `1..=count` through the
//! [`BoundedWorkerPool`]. Failed lookups are logged and skipped; only a failure to read
//! the pair count aborts the pass.

use anyhow::{Context, Result};
use ethers::types::Address;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::chain_client::PairRegistry;
use crate::errors::ChainError;
use crate::pair_set::{PairAggregator, PairSet};
use crate::types::Pair;
use crate::worker_pool::{BoundedWorkerPool, PoolReport};

/// Logs `done/total` every `interval` completed lookups.
#[derive(Debug)]
pub struct Progress {
    total: u64,
    interval: u64,
    done: AtomicU64,
}

impl Progress {
    pub fn new(total: u64, interval: u64) -> Self {
        Self {
            total,
            interval,
            done: AtomicU64::new(0),
        }
    }

    /// Marks one lookup as finished and returns the running count.
    pub fn tick(&self) -> u64 {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.interval > 0 && done % self.interval == 0 && done < self.total {
            info!("📊 Enumerated {}/{} pairs", done, self.total);
        }
        done
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }
}

/// Result of one enumeration pass.
#[derive(Debug, Clone)]
pub struct EnumerationReport {
    pub pairs: PairSet,
    pub pool: PoolReport,
    pub elapsed: Duration,
}

impl EnumerationReport {
    pub fn pair_count(&self) -> u64 {
        self.pairs.pair_count()
    }

    /// True if every id was dispatched (the pass was not cancelled part-way).
    pub fn is_complete(&self) -> bool {
        !self.pool.cancelled && self.pool.dispatched == self.pairs.pair_count()
    }
}

/// Resolves every pair registered by `registry`.
///
/// # Errors
///
/// Only if the pair count cannot be read. Individual `pair_at` failures are reported and
/// recorded in [`PairSet::failed_ids`].
pub async fn enumerate_pairs<R>(
    registry: Arc<R>,
    pool: &BoundedWorkerPool,
    progress_interval: u64,
    cancel: &CancellationToken,
) -> Result<EnumerationReport>
where
    R: PairRegistry + ?Sized + 'static,
{
    let started = Instant::now();
    let factory = registry.factory();

    let pair_count = registry
        .pair_count()
        .await
        .with_context(|| format!("failed to read pair count of factory {:?}", factory))?;
    info!(
        "🔍 Factory {:?} has {} pairs, resolving with up to {} concurrent calls",
        factory,
        pair_count,
        pool.max_concurrency()
    );

    let aggregator = PairAggregator::new(pair_count);
    let sink = aggregator.sink();
    let progress = Arc::new(Progress::new(pair_count, progress_interval));
    let tracker = Arc::clone(&progress);

    let report = pool
        .run(
            1..=pair_count,
            move |id| {
                let registry = Arc::clone(&registry);
                async move {
                    let call_started = Instant::now();
                    (registry.pair_at(id).await, call_started.elapsed())
                }
            },
            move |id, (result, latency): (Result<Address, ChainError>, Duration)| {
                match result {
                    Ok(address) => {
                        debug!("Pair {} resolved to {:?} in {:?}", id, address, latency);
                        sink.append(Pair::new(id, address));
                    }
                    Err(e) => {
                        warn!("⚠️ Failed to resolve pair {}: {}", id, e);
                        sink.record_failure(id);
                    }
                }
                tracker.tick();
            },
            cancel,
        )
        .await;

    let pairs = aggregator
        .finish()
        .context("pair writers outlived the enumeration barrier")?;
    let elapsed = started.elapsed();

    info!(
        "✅ Enumeration finished: {}/{} pairs resolved, {} failed, {} lookups in {:?}",
        pairs.len(),
        pair_count,
        pairs.failed_ids().len(),
        progress.done(),
        elapsed
    );
    if report.cancelled {
        warn!(
            "⚠️ Enumeration cancelled after dispatching {}/{} lookups",
            report.dispatched, pair_count
        );
    }

    Ok(EnumerationReport {
        pairs,
        pool: report,
        elapsed,
    })
}

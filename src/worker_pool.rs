//! # Bounded Worker Pool
//!
//! Runs one task per id with at most `max_concurrency` remote calls in flight.
//!
//! Each task is split in two halves:
//!
//! - **call**: the remote lookup, executed while the task holds a concurrency slot
//! - **finish**: post-processing of the result, executed after the slot is released
//!
//! Releasing the slot as soon as the call returns lets the next queued task start its call
//! while the previous one is still processing its result. Slots are RAII permits, so a
//! failing or panicking call still gives its slot back.
//!
//! [`BoundedWorkerPool::run`] is the wait-all barrier: it returns only after every
//! dispatched task has finished both halves.

use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// One unit of the concurrency budget. Dropping it frees the slot.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

/// Outcome of one [`BoundedWorkerPool::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolReport {
    /// Tasks that were handed a slot and spawned
    pub dispatched: u64,
    /// Tasks that ran both halves to completion
    pub completed: u64,
    /// Tasks that panicked
    pub panicked: u64,
    /// Most tasks held by the pool at once, finished-but-unjoined ones included
    pub peak_pending: usize,
    /// Dispatching stopped early because the token was cancelled
    pub cancelled: bool,
}

impl PoolReport {
    fn record(&mut self, joined: Result<(), JoinError>) {
        match joined {
            Ok(()) => self.completed += 1,
            Err(e) => {
                self.panicked += 1;
                warn!("⚠️ Worker task failed: {}", e);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoundedWorkerPool {
    max_concurrency: usize,
    slots: Arc<Semaphore>,
}

impl BoundedWorkerPool {
    /// A pool with `max_concurrency` slots (at least one).
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            max_concurrency,
            slots: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Runs `call` then `finish` for every id and waits for all of them.
    ///
    /// Ids are dispatched in iteration order, each one only after a slot is free; completion
    /// order is unspecified. When `cancel` fires, no further ids are dispatched, but tasks
    /// already running are still awaited before this returns.
    pub async fn run<I, C, Fut, R, F>(
        &self,
        ids: I,
        call: C,
        finish: F,
        cancel: &CancellationToken,
    ) -> PoolReport
    where
        I: IntoIterator<Item = u64>,
        C: Fn(u64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Send + 'static,
        F: Fn(u64, R) + Send + Sync + 'static,
    {
        let call = Arc::new(call);
        let finish = Arc::new(finish);
        let mut tasks = JoinSet::new();
        let mut report = PoolReport::default();

        for id in ids {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    // The semaphore is owned by the pool and never closed.
                    Err(_) => {
                        report.cancelled = true;
                        break;
                    }
                },
            };

            // Join finished tasks as we go so the set stays bounded by the slot count.
            while let Some(joined) = tasks.try_join_next() {
                report.record(joined);
            }

            let call = Arc::clone(&call);
            let finish = Arc::clone(&finish);
            tasks.spawn(async move {
                let slot = Slot { _permit: permit };
                let result = call(id).await;
                drop(slot);
                finish(id, result);
            });
            report.dispatched += 1;
            report.peak_pending = report.peak_pending.max(tasks.len());
        }

        if report.cancelled {
            debug!(
                "Dispatch cancelled after {} tasks, waiting for in-flight work",
                report.dispatched
            );
        }

        while let Some(joined) = tasks.join_next().await {
            report.record(joined);
        }

        report
    }
}

//! # Orchestrator
//!
//! Runs the two phases in order:
//!
//! 1. **Enumeration**: resolve every factory pair through the bounded worker pool
//! 2. **Monitoring**: subscribe to all resolved addresses and forward their events
//!
//! The address index is built only after the enumeration barrier, and the subscription is
//! opened only after the index is complete. A cancelled enumeration never subscribes, since
//! a partial filter would silently leave pairs unmonitored.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pair_monitor::adapters::WsChainClient;
//! use pair_monitor::monitor::LoggingHandler;
//! use pair_monitor::orchestrator::Orchestrator;
//! use pair_monitor::settings::Settings;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let settings = Settings::new()?;
//! let client = Arc::new(WsChainClient::dial(&settings.rpc.url).await?);
//! let registry = Arc::new(client.factory_registry(settings.factory_address()?));
//!
//! let orchestrator = Orchestrator::new(registry, client, &settings);
//! orchestrator.run(&LoggingHandler, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::address_index::AddressIndex;
use crate::chain_client::{LogSource, PairRegistry};
use crate::enumeration::{enumerate_pairs, EnumerationReport};
use crate::monitor::{EventHandler, EventMultiplexer, MonitorReport, RestartPolicy};
use crate::settings::Settings;
use crate::worker_pool::BoundedWorkerPool;

/// What a full run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub enumeration: EnumerationReport,
    pub index: AddressIndex,
    /// `None` if monitoring never started because enumeration was cancelled
    pub monitor: Option<MonitorReport>,
}

pub struct Orchestrator<R: ?Sized, S: ?Sized> {
    registry: Arc<R>,
    source: Arc<S>,
    pool: BoundedWorkerPool,
    progress_interval: u64,
    restart: RestartPolicy,
}

impl<R, S> Orchestrator<R, S>
where
    R: PairRegistry + ?Sized + 'static,
    S: LogSource + ?Sized,
{
    pub fn new(registry: Arc<R>, source: Arc<S>, settings: &Settings) -> Self {
        Self {
            registry,
            source,
            pool: BoundedWorkerPool::new(settings.enumeration.max_concurrency),
            progress_interval: settings.enumeration.progress_interval,
            restart: RestartPolicy::from(&settings.monitor),
        }
    }

    /// Enumerates all pairs and builds the address index.
    pub async fn enumerate(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(EnumerationReport, AddressIndex)> {
        let report = enumerate_pairs(
            Arc::clone(&self.registry),
            &self.pool,
            self.progress_interval,
            cancel,
        )
        .await?;
        let index = AddressIndex::build(&report.pairs);
        info!(
            "🗂️ Address index built: {} unique addresses from {} pairs",
            index.len(),
            report.pairs.len()
        );
        Ok((report, index))
    }

    /// Runs enumeration, then monitors until cancelled or the subscription is exhausted.
    ///
    /// # Errors
    ///
    /// If the pair count cannot be read or the first subscription cannot be opened.
    pub async fn run<H>(&self, handler: &H, cancel: &CancellationToken) -> Result<RunSummary>
    where
        H: EventHandler + ?Sized,
    {
        let (enumeration, index) = self.enumerate(cancel).await?;

        if !enumeration.is_complete() {
            warn!("⚠️ Enumeration did not complete, not starting the log subscription");
            return Ok(RunSummary {
                enumeration,
                index,
                monitor: None,
            });
        }

        let multiplexer = EventMultiplexer::new(index.clone()).with_restart_policy(self.restart);
        let monitor = multiplexer
            .run(self.source.as_ref(), handler, cancel)
            .await
            .context("failed to start monitoring pair events")?;
        info!("🛑 Monitoring stopped: {:?} ({:?})", monitor.exit, monitor.stats);

        Ok(RunSummary {
            enumeration,
            index,
            monitor: Some(monitor),
        })
    }
}

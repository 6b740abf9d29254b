//! # Event Subscription Multiplexer
//!
//! Watches every address of an [`AddressIndex`] through a single log subscription.
//!
//! ## States
//!
//! - **Initializing**: open the subscription with the full index as filter. Failing to
//!   open the first subscription is fatal for the monitoring phase.
//! - **Listening**: one task waits on the error channel and the log channel at once.
//!   Logs are converted to [`LiquidityEvent`]s and handed to the [`EventHandler`];
//!   errors are reported and listening continues. The loop has no exit condition of its
//!   own: it ends on cancellation, or when both channels are closed (exhausted).
//!
//! ## Exhausted subscriptions
//!
//! An exhausted subscription never delivers again. Depending on [`RestartPolicy`] the
//! multiplexer either returns [`MonitorExit::Exhausted`] or re-opens the subscription over
//! the same index with exponential backoff.

use ethers::types::Log;
use log::{error, info, warn};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::address_index::AddressIndex;
use crate::chain_client::{LogSource, LogSubscription};
use crate::errors::{ChainError, SubscriptionError};
use crate::settings;
use crate::types::LiquidityEvent;

/// Receives every event emitted by a monitored pair.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: LiquidityEvent);
}

/// Reports each event through the logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: LiquidityEvent) {
        info!(
            "💧 Liquidity change at {:?}: {} (block {:?}, tx {:?})",
            event.address, event.kind, event.block_number, event.transaction_hash
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub enabled: bool,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RestartPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ..Self::disabled()
        }
    }
}

impl From<&settings::Monitor> for RestartPolicy {
    fn from(cfg: &settings::Monitor) -> Self {
        Self {
            enabled: cfg.restart_on_exhaustion,
            initial_delay: cfg.reconnect_delay(),
            max_delay: cfg.max_reconnect_delay().max(cfg.reconnect_delay()),
        }
    }
}

/// Re-subscribe delays: `initial_delay`, doubling up to `max_delay`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: &RestartPolicy) -> Self {
        let initial = policy.initial_delay.max(Duration::from_millis(1));
        Self {
            initial,
            max: policy.max_delay.max(initial),
            current: initial,
        }
    }

    /// Delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// The cancellation token fired
    Cancelled,
    /// Both subscription channels closed and restarts are disabled
    Exhausted,
    /// The address index was empty, so no subscription was opened
    NothingToMonitor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub subscriptions_opened: u64,
    pub events_forwarded: u64,
    pub errors_reported: u64,
    pub foreign_events_dropped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorReport {
    pub exit: MonitorExit,
    pub stats: MonitorStats,
}

pub struct EventMultiplexer {
    index: AddressIndex,
    restart: RestartPolicy,
}

impl EventMultiplexer {
    pub fn new(index: AddressIndex) -> Self {
        Self {
            index,
            restart: RestartPolicy::default(),
        }
    }

    pub fn with_restart_policy(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    pub fn index(&self) -> &AddressIndex {
        &self.index
    }

    /// Subscribes to the index and forwards events to `handler` until cancelled or
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Only if the first subscription cannot be opened.
    pub async fn run<S, H>(
        &self,
        source: &S,
        handler: &H,
        cancel: &CancellationToken,
    ) -> Result<MonitorReport, ChainError>
    where
        S: LogSource + ?Sized,
        H: EventHandler + ?Sized,
    {
        let mut stats = MonitorStats::default();

        if self.index.is_empty() {
            warn!("⚠️ No pair addresses to monitor, skipping log subscription");
            return Ok(MonitorReport {
                exit: MonitorExit::NothingToMonitor,
                stats,
            });
        }

        let addresses = self.index.to_vec();
        let mut subscription = source.subscribe_logs(&addresses).await?;
        stats.subscriptions_opened += 1;
        info!("📡 Monitoring {} pair addresses", addresses.len());

        let mut backoff = Backoff::new(&self.restart);
        loop {
            let forwarded_before = stats.events_forwarded;
            let exit = self.listen(subscription, handler, cancel, &mut stats).await;

            if exit == MonitorExit::Cancelled || !self.restart.enabled {
                return Ok(MonitorReport { exit, stats });
            }

            // A subscription that delivered something was healthy; start backoff over.
            if stats.events_forwarded > forwarded_before {
                backoff.reset();
            }

            subscription = loop {
                let delay = backoff.next_delay();
                warn!("⚠️ Log subscription exhausted, re-subscribing in {:?}", delay);
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Ok(MonitorReport { exit: MonitorExit::Cancelled, stats });
                    }
                    _ = sleep(delay) => {}
                }

                match source.subscribe_logs(&addresses).await {
                    Ok(subscription) => {
                        stats.subscriptions_opened += 1;
                        info!("✅ Log subscription re-opened");
                        break subscription;
                    }
                    Err(e) => {
                        stats.errors_reported += 1;
                        error!("❌ Failed to re-open log subscription: {}", e);
                    }
                }
            };
        }
    }

    /// The Listening state for one subscription.
    pub async fn listen<H>(
        &self,
        mut subscription: LogSubscription,
        handler: &H,
        cancel: &CancellationToken,
        stats: &mut MonitorStats,
    ) -> MonitorExit
    where
        H: EventHandler + ?Sized,
    {
        let mut logs_open = true;
        let mut errors_open = true;

        while logs_open || errors_open {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return MonitorExit::Cancelled,

                error_opt = subscription.errors.recv(), if errors_open => match error_opt {
                    Some(e) => self.report_error(&e, stats),
                    None => errors_open = false,
                },

                log_opt = subscription.logs.recv(), if logs_open => match log_opt {
                    Some(log) => self.forward(log, handler, stats),
                    None => logs_open = false,
                },
            }
        }

        MonitorExit::Exhausted
    }

    fn report_error(&self, e: &SubscriptionError, stats: &mut MonitorStats) {
        stats.errors_reported += 1;
        warn!("⚠️ Log subscription error: {}", e);
    }

    fn forward<H>(&self, log: Log, handler: &H, stats: &mut MonitorStats)
    where
        H: EventHandler + ?Sized,
    {
        // Filtering is the node's job, but nothing outside the index reaches the handler.
        if !self.index.contains(&log.address) {
            stats.foreign_events_dropped += 1;
            warn!(
                "⚠️ Dropping log from unmonitored address {:?}",
                log.address
            );
            return;
        }

        stats.events_forwarded += 1;
        handler.handle(LiquidityEvent::from(log));
    }
}

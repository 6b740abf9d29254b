//! # WebSocket Chain Client
//!
//! Connects to a node over `eth_subscribe`-capable WebSocket and provides:
//!
//! - **Contract calls**: the shared `Provider<Ws>` is handed to contract bindings
//!   (see [`WsChainClient::factory_registry`]); calls are safe to issue concurrently
//! - **Log subscriptions**: `eth_subscribe("logs")` filtered by address, forwarded into a
//!   [`LogSubscription`] by a background task
//! - **Health checks**: `eth_blockNumber` every `health_check_interval`; failures are
//!   reported on the subscription's error channel without closing it

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Provider, Ws};
use futures_util::StreamExt;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use url::Url;

use crate::adapters::uniswap_v2::UniswapV2FactoryRegistry;
use crate::chain_client::{LogSource, LogSubscription, SubscriptionFeed};
use crate::errors::{ChainError, SubscriptionError};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Converts an endpoint into the WebSocket URL the provider connects to.
///
/// `http(s)://` becomes `ws(s)://`, a bare `host:port` becomes `ws://host:port`.
pub fn normalize_ws_url(endpoint: &str) -> Result<Url, ChainError> {
    let endpoint = endpoint.trim();
    let candidate = if let Some(rest) = endpoint.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = endpoint.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        endpoint.to_string()
    } else {
        format!("ws://{}", endpoint)
    };

    let url = Url::parse(&candidate).map_err(|e| ChainError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ChainError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

/// WebSocket connection to a node, shared by the factory binding and log subscriptions.
pub struct WsChainClient {
    url: Url,
    provider: Arc<Provider<Ws>>,
    channel_capacity: usize,
    health_check_interval: Duration,
}

impl WsChainClient {
    /// Connects to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::InvalidEndpoint` if the endpoint cannot be turned into a
    /// WebSocket URL and `ChainError::Connect` if the handshake fails.
    pub async fn dial(endpoint: &str) -> Result<Self, ChainError> {
        let url = normalize_ws_url(endpoint)?;
        info!("🔌 [WsChainClient] Connecting to WebSocket: {}", url);

        let provider = Provider::<Ws>::connect(url.as_str())
            .await
            .map_err(|e| ChainError::Connect {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })?;

        info!("✅ [WsChainClient] Connected to {}", url);
        Ok(Self {
            url,
            provider: Arc::new(provider),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
        })
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval.max(Duration::from_secs(1));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn provider(&self) -> Arc<Provider<Ws>> {
        Arc::clone(&self.provider)
    }

    /// Factory binding that issues its calls over this connection.
    pub fn factory_registry(&self, factory: Address) -> UniswapV2FactoryRegistry<Provider<Ws>> {
        UniswapV2FactoryRegistry::new(factory, self.provider())
    }
}

#[async_trait]
impl LogSource for WsChainClient {
    async fn subscribe_logs(&self, addresses: &[Address]) -> Result<LogSubscription, ChainError> {
        let filter = Filter::new().address(ValueOrArray::Array(addresses.to_vec()));
        let (feed, subscription) = LogSubscription::channel(self.channel_capacity);
        let (ready_tx, ready_rx) = oneshot::channel();

        let producer = tokio::spawn(forward_logs(
            self.provider(),
            filter,
            feed,
            self.health_check_interval,
            ready_tx,
        ));

        match ready_rx.await {
            Ok(Ok(())) => {
                info!(
                    "✅ [WsChainClient] Subscribed to logs of {} addresses",
                    addresses.len()
                );
                Ok(subscription.with_producer(producer))
            }
            Ok(Err(reason)) => Err(ChainError::Subscribe(reason)),
            Err(_) => Err(ChainError::Subscribe(
                "subscription task exited before eth_subscribe returned".to_string(),
            )),
        }
    }
}

/// Drives one `eth_subscribe("logs")` stream into `feed` until the stream ends or the
/// subscription is dropped.
async fn forward_logs(
    provider: Arc<Provider<Ws>>,
    filter: Filter,
    feed: SubscriptionFeed,
    health_check_interval: Duration,
    ready: oneshot::Sender<Result<(), String>>,
) {
    let mut stream = match provider.subscribe_logs(&filter).await {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };

    let mut health_check = tokio::time::interval(health_check_interval);
    // The first tick completes immediately; the connection was just proven healthy.
    health_check.tick().await;

    loop {
        tokio::select! {
            log_opt = stream.next() => {
                match log_opt {
                    Some(log) => {
                        if feed.logs.send(log).await.is_err() {
                            debug!("[WsChainClient] Subscription dropped, stopping log forwarder");
                            return;
                        }
                    }
                    None => {
                        warn!("⚠️ [WsChainClient] Log stream ended");
                        let _ = feed.errors.send(SubscriptionError::Closed).await;
                        return;
                    }
                }
            }

            _ = health_check.tick() => {
                if let Err(e) = provider.get_block_number().await {
                    let error = SubscriptionError::Transport(e.to_string());
                    if feed.errors.send(error).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_url_conversion() {
        assert_eq!(
            normalize_ws_url("http://127.0.0.1:8545").unwrap().as_str(),
            "ws://127.0.0.1:8545/"
        );
        assert_eq!(
            normalize_ws_url("https://mainnet.example.org/v3/key").unwrap().as_str(),
            "wss://mainnet.example.org/v3/key"
        );
        assert_eq!(
            normalize_ws_url("wss://node.example.org").unwrap().as_str(),
            "wss://node.example.org/"
        );
        assert_eq!(
            normalize_ws_url("localhost:8546").unwrap().as_str(),
            "ws://localhost:8546/"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        assert!(matches!(
            normalize_ws_url("http://"),
            Err(ChainError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            normalize_ws_url(""),
            Err(ChainError::InvalidEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_dial_unreachable_endpoint_fails() {
        let result = WsChainClient::dial("ws://127.0.0.1:1").await;
        assert!(matches!(result, Err(ChainError::Connect { .. })));
    }
}

//! Public relay tier
//!
//! Serves external clients from the value cached by an
//! [`UpstreamRelayClient`](crate::client::UpstreamRelayClient). A single
//! pump task re-pushes the cached value to every subscriber on a fixed
//! interval (continuous-push cadence); new subscribers get the cached value
//! immediately.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::trace::TraceLayer;

use crate::client::PriceCache;
use crate::error::Result;
use crate::registry::BroadcastHub;
use crate::stats::{HubSnapshot, RelaySnapshot, RelayStats};

use super::binder::BoundListener;
use super::config::ServerConfig;
use super::listener::serve;
use super::routes::{self, ClientCount};

/// Streaming endpoint of the public tier
pub const PUBLIC_PRICE_UPDATES_PATH: &str = "/public-price-updates";

/// Body of the public tier's `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct PublicStats {
    #[serde(flatten)]
    pub hub: HubSnapshot,
    pub relay: RelaySnapshot,
}

/// The public tier: cached upstream value, hub and HTTP surface
#[derive(Clone)]
pub struct PublicTier {
    config: ServerConfig,
    cache: PriceCache,
    relay: Arc<RelayStats>,
    hub: Arc<BroadcastHub>,
}

impl PublicTier {
    /// Create a tier reading from `cache`, reporting `relay` link stats
    pub fn new(config: ServerConfig, cache: PriceCache, relay: Arc<RelayStats>) -> Self {
        let hub = Arc::new(BroadcastHub::with_config(config.registry.clone()));

        Self {
            config,
            cache,
            relay,
            hub,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Routes: `/public-price-updates`, `/client-count`, `/stats`
    pub fn router(&self) -> Router {
        Router::new()
            .route(PUBLIC_PRICE_UPDATES_PATH, get(public_price_updates))
            .route("/client-count", get(client_count))
            .route("/stats", get(stats))
            .layer(routes::cors())
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    /// Start re-pushing the cached value every `push_interval`
    ///
    /// Nothing is pushed until the first upstream tick has arrived. The task
    /// exits once the hub is closed.
    pub fn spawn_pump(&self) -> JoinHandle<()> {
        let hub = Arc::clone(&self.hub);
        let cache = self.cache.clone();
        let interval = self.config.push_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if hub.is_closed() {
                    break;
                }
                if let Some(tick) = cache.latest() {
                    hub.broadcast(&tick);
                }
            }

            tracing::debug!("Relay pump stopped");
        })
    }

    /// Run the pump and serve on `listener` until `shutdown` resolves
    pub async fn run_until<F>(self, listener: BoundListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            port = listener.port(),
            push_interval_ms = self.config.push_interval.as_millis() as u64,
            network_latency_ms = self.config.network_latency.as_millis() as u64,
            "Public tier starting"
        );

        let pump = self.spawn_pump();
        let result = serve(listener, self.router(), Arc::clone(&self.hub), shutdown).await;
        pump.abort();

        result
    }
}

async fn public_price_updates(State(tier): State<PublicTier>) -> impl IntoResponse {
    let subscription = tier.hub.subscribe_with(|| tier.cache.latest());
    routes::price_stream(
        subscription,
        tier.config.network_latency,
        tier.config.keep_alive,
    )
}

async fn client_count(State(tier): State<PublicTier>) -> Json<ClientCount> {
    Json(ClientCount {
        connected_clients: tier.hub.client_count(),
    })
}

async fn stats(State(tier): State<PublicTier>) -> Json<PublicStats> {
    Json(PublicStats {
        hub: tier.hub.snapshot(),
        relay: tier.relay.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;
    use crate::client::{RelayConfig, UpstreamRelayClient};

    fn idle_tier(config: ServerConfig) -> PublicTier {
        // Never spawned, so the cache stays empty
        let (client, cache) = UpstreamRelayClient::new(RelayConfig::default()).unwrap();
        PublicTier::new(config, cache, client.stats())
    }

    #[tokio::test]
    async fn test_pump_is_silent_without_upstream_value() {
        let tier = idle_tier(ServerConfig::default().push_interval(Duration::from_millis(5)));
        let mut sub = tier.hub().subscribe_with(|| tier.cache().latest());
        let pump = tier.spawn_pump();

        let next = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(next.is_err());

        pump.abort();
    }

    #[tokio::test]
    async fn test_pump_stops_when_hub_closes() {
        let tier = idle_tier(ServerConfig::default().push_interval(Duration::from_millis(5)));
        let pump = tier.spawn_pump();

        tier.hub().close();

        tokio::time::timeout(Duration::from_secs(1), pump)
            .await
            .expect("pump should exit after close")
            .unwrap();
    }

    #[test]
    fn test_stats_body_shape() {
        let stats = PublicStats {
            hub: crate::stats::HubStats::new().snapshot(2),
            relay: RelayStats::new().snapshot(),
        };

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["connectedClients"], 2);
        assert_eq!(json["relay"]["connected"], false);
    }
}

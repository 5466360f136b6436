//! Ingest tier
//!
//! Owns the canonical [`PriceSource`] and pushes every update to its
//! subscribers as it happens (event-driven cadence). New subscribers get
//! the current value immediately.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::registry::{BroadcastHub, PriceTick};
use crate::source::PriceSource;
use crate::stats::HubSnapshot;

use super::binder::BoundListener;
use super::config::ServerConfig;
use super::listener::serve;
use super::routes::{self, ClientCount};

/// Streaming endpoint of the ingest tier
pub const PRICE_UPDATES_PATH: &str = "/price-updates";

/// The ingest tier: price source, hub and HTTP surface
#[derive(Clone)]
pub struct IngestTier {
    config: ServerConfig,
    source: Arc<PriceSource>,
    hub: Arc<BroadcastHub>,
}

impl IngestTier {
    /// Create a tier with its own source and hub
    pub fn new(config: ServerConfig) -> Self {
        let source = Arc::new(PriceSource::new(config.price_model));
        let hub = Arc::new(BroadcastHub::with_config(config.registry.clone()));

        Self {
            config,
            source,
            hub,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<PriceSource> {
        &self.source
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Replace the current price and broadcast it
    ///
    /// Returns the number of subscribers that accepted the tick.
    pub fn publish(&self, tick: PriceTick) -> usize {
        let tick = self.source.set(tick);
        self.hub.broadcast(&tick)
    }

    /// Routes: `/price-updates`, `/client-count`, `/stats`
    pub fn router(&self) -> Router {
        Router::new()
            .route(PRICE_UPDATES_PATH, get(price_updates))
            .route("/client-count", get(client_count))
            .route("/stats", get(stats))
            .layer(routes::cors())
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    /// Start the periodic price updates
    pub fn spawn_updates(&self) -> JoinHandle<()> {
        self.source
            .spawn_updates(Arc::clone(&self.hub), self.config.update_schedule)
    }

    /// Run updates and serve on `listener` until `shutdown` resolves
    pub async fn run_until<F>(self, listener: BoundListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            port = listener.port(),
            schedule = ?self.config.update_schedule,
            network_latency_ms = self.config.network_latency.as_millis() as u64,
            model = ?self.config.price_model,
            "Ingest tier starting"
        );

        let updates = self.spawn_updates();
        let result = serve(listener, self.router(), Arc::clone(&self.hub), shutdown).await;
        updates.abort();

        result
    }
}

async fn price_updates(State(tier): State<IngestTier>) -> impl IntoResponse {
    let subscription = tier.hub.subscribe_with(|| Some(tier.source.current()));
    routes::price_stream(
        subscription,
        tier.config.network_latency,
        tier.config.keep_alive,
    )
}

async fn client_count(State(tier): State<IngestTier>) -> Json<ClientCount> {
    Json(ClientCount {
        connected_clients: tier.hub.client_count(),
    })
}

async fn stats(State(tier): State<IngestTier>) -> Json<HubSnapshot> {
    Json(tier.hub.snapshot())
}

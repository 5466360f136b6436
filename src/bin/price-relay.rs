//! Public relay tier server
//!
//! Subscribes once to an ingest tier and re-serves the cached price to any
//! number of `/public-price-updates` clients.
//!
//! Run with: cargo run --bin price-relay
//!
//! Examples:
//!   cargo run --bin price-relay                                   # port 3001 or next free
//!   UPSTREAM_URL=http://10.0.0.5:3000/price-updates cargo run --bin price-relay

use std::net::IpAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use price_relay::client::{RelayConfig, UpstreamRelayClient};
use price_relay::registry::RegistryConfig;
use price_relay::server::{PortBinder, PublicTier, ServerConfig};
use price_relay::{logging, Result};

#[derive(Parser, Debug)]
#[command(name = "price-relay")]
#[command(about = "Public tier: relays an ingest tier's price over SSE", long_about = None)]
struct Args {
    /// Interface to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// First port to try; the next free port is used if it is taken
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Last port to try
    #[arg(long, env = "MAX_PORT", default_value_t = u16::MAX)]
    max_port: u16,

    /// Streaming endpoint of the ingest tier
    #[arg(
        long,
        env = "UPSTREAM_URL",
        default_value = "http://127.0.0.1:3000/price-updates"
    )]
    upstream_url: String,

    /// Milliseconds between pushes of the cached value
    #[arg(long, env = "PUSH_INTERVAL", default_value_t = 100)]
    push_interval: u64,

    /// Milliseconds of emulated latency before each push
    #[arg(long, env = "NETWORK_LATENCY", default_value_t = 0)]
    network_latency: u64,

    /// First reconnect delay in milliseconds
    #[arg(long, env = "MIN_BACKOFF", default_value_t = 100)]
    min_backoff: u64,

    /// Reconnect delay ceiling in milliseconds
    #[arg(long, env = "MAX_BACKOFF", default_value_t = 5_000)]
    max_backoff: u64,

    /// Seconds without an upstream tick before reconnecting
    #[arg(long, env = "UPSTREAM_IDLE_TIMEOUT", default_value_t = 30)]
    idle_timeout: u64,

    /// Ticks queued per subscriber before it is dropped as too slow
    #[arg(long, env = "SUBSCRIBER_BUFFER", default_value_t = 64)]
    subscriber_buffer: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Public tier failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let relay_config = RelayConfig::new(args.upstream_url)
        .backoff(
            Duration::from_millis(args.min_backoff),
            Duration::from_millis(args.max_backoff),
        )
        .idle_timeout(Duration::from_secs(args.idle_timeout));

    let config = ServerConfig::default()
        .host(args.host)
        .port(args.port)
        .max_port(args.max_port)
        .push_interval(Duration::from_millis(args.push_interval))
        .network_latency(Duration::from_millis(args.network_latency))
        .registry(RegistryConfig::default().subscriber_buffer(args.subscriber_buffer));

    info!(upstream = %relay_config.upstream_url, "Connecting to ingest tier");
    let (client, cache) = UpstreamRelayClient::new(relay_config)?;
    let stats = client.stats();
    let upstream = client.spawn();

    let result = async {
        let listener = PortBinder::from_config(&config)
            .bind_from(config.port)
            .await?;
        info!("Public facing server is running on http://localhost:{}", listener.port());

        PublicTier::new(config, cache, stats)
            .run_until(listener, shutdown_signal())
            .await
    }
    .await;

    upstream.abort();
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}

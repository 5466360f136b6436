//! Ingest tier server
//!
//! Owns the canonical price, updates it on a fixed interval and streams
//! every update to `/price-updates` subscribers.
//!
//! Run with: cargo run --bin price-ingest
//!
//! Examples:
//!   cargo run --bin price-ingest                                  # port 3000 or next free
//!   PRICE_UPDATE_INTERVAL=500 cargo run --bin price-ingest        # update every 500ms
//!   PRICE_UPDATE_JITTER=100-3000 cargo run --bin price-ingest     # random 100ms..3s gaps
//!   NETWORK_LATENCY=50 cargo run --bin price-ingest -- --price-model walk

use std::net::IpAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use price_relay::registry::RegistryConfig;
use price_relay::server::{IngestTier, PortBinder, ServerConfig};
use price_relay::source::{PriceModel, UpdateSchedule};
use price_relay::{logging, Result};

#[derive(Parser, Debug)]
#[command(name = "price-ingest")]
#[command(about = "Ingest tier: canonical price streamed over SSE", long_about = None)]
struct Args {
    /// Interface to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// First port to try; the next free port is used if it is taken
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Last port to try
    #[arg(long, env = "MAX_PORT", default_value_t = u16::MAX)]
    max_port: u16,

    /// Milliseconds between price updates
    #[arg(long, env = "PRICE_UPDATE_INTERVAL", default_value_t = 100)]
    update_interval: u64,

    /// Random delay range between updates in milliseconds, e.g. 100-3000;
    /// replaces the fixed interval when set
    #[arg(long, env = "PRICE_UPDATE_JITTER")]
    update_jitter: Option<UpdateSchedule>,

    /// Milliseconds of emulated latency before each push
    #[arg(long, env = "NETWORK_LATENCY", default_value_t = 0)]
    network_latency: u64,

    /// Price model: uniform or walk
    #[arg(long, env = "PRICE_MODEL", default_value = "uniform")]
    price_model: PriceModel,

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
            error!(error = %e, "Ingest tier failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = ServerConfig::default()
        .host(args.host)
        .port(args.port)
        .max_port(args.max_port)
        .update_interval(Duration::from_millis(args.update_interval))
        .network_latency(Duration::from_millis(args.network_latency))
        .price_model(args.price_model)
        .registry(RegistryConfig::default().subscriber_buffer(args.subscriber_buffer));
    if let Some(schedule) = args.update_jitter {
        config = config.update_schedule(schedule);
    }

    info!(
        schedule = ?config.update_schedule,
        network_latency_ms = args.network_latency,
        "Configuration loaded"
    );

    let listener = PortBinder::from_config(&config)
        .bind_from(config.port)
        .await?;
    info!("Price ingest server is running on http://localhost:{}", listener.port());

    IngestTier::new(config)
        .run_until(listener, shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}

//! Load generator for the streaming endpoints
//!
//! Opens many SSE connections, one every `--connect-delay` milliseconds,
//! counts received messages, and prints a summary after `--duration`
//! seconds or on Ctrl-C.
//!
//! Run with: cargo run --release --bin price-loadtest -- --connections 200

use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};

use price_relay::client::PriceFeed;
use price_relay::logging;

#[derive(Parser, Debug)]
#[command(name = "price-loadtest")]
#[command(about = "Open many SSE price subscriptions and count messages", long_about = None)]
struct Args {
    /// Streaming endpoint to load
    #[arg(
        long,
        env = "LOADTEST_URL",
        default_value = "http://127.0.0.1:3000/price-updates"
    )]
    url: String,

    /// Number of connections to open
    #[arg(long, default_value_t = 1000)]
    connections: usize,

    /// Test duration in seconds
    #[arg(long, default_value_t = 60)]
    duration: u64,

    /// Milliseconds between opening connections
    #[arg(long, default_value_t = 100)]
    connect_delay: u64,
}

#[derive(Default)]
struct Counters {
    opened: AtomicU64,
    messages: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn report(&self, outcome: &str) {
        let opened = self.opened.load(Ordering::Relaxed);
        let messages = self.messages.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let average = if opened > 0 {
            messages as f64 / opened as f64
        } else {
            0.0
        };

        info!("Test {outcome}.");
        info!("Total messages received: {messages}");
        info!("Active connections: {opened}");
        info!("Failed connections: {failed}");
        info!("Average messages per successful connection: {average:.2}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();

    let http = match reqwest::Client::builder().build() {
        Ok(http) => http,
        Err(e) => {
            warn!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };
    let counters = Arc::new(Counters::default());

    let opener = tokio::spawn(open_connections(
        http,
        args.url.clone(),
        args.connections,
        Duration::from_millis(args.connect_delay),
        Arc::clone(&counters),
    ));

    let outcome = tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.duration)) => "completed",
        _ = tokio::signal::ctrl_c() => "interrupted",
    };

    opener.abort();
    counters.report(outcome);
    ExitCode::SUCCESS
}

async fn open_connections(
    http: reqwest::Client,
    url: String,
    connections: usize,
    delay: Duration,
    counters: Arc<Counters>,
) {
    for _ in 0..connections {
        tokio::time::sleep(delay).await;

        let http = http.clone();
        let url = url.clone();
        let counters = Arc::clone(&counters);
        tokio::spawn(async move {
            let mut feed = match PriceFeed::connect(&http, &url).await {
                Ok(feed) => feed,
                Err(e) => {
                    warn!(error = %e, "Connection failed");
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            };

            let opened = counters.opened.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(active = opened, "Connection opened");

            loop {
                match feed.next_tick().await {
                    Ok(Some(_)) => {
                        counters.messages.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Stream failed");
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                }
            }
        });
    }

    info!(connections = connections, "All connections requested");
}

//! Log output for the binaries

use tracing_subscriber::EnvFilter;

/// Install a compact `tracing` subscriber
///
/// Level defaults to `info` and is overridden by `RUST_LOG`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .compact()
        .init();
}

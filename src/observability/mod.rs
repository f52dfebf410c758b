//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber.
///
/// Filter via `RUST_LOG` (default `info`). Safe to call more than once; only
/// the first call installs a subscriber.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

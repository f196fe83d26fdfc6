//! Logging setup for binaries and tests.
//!
//! The library itself only emits `tracing` events; installing a subscriber is up to the caller.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "csv_autoload=info";

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` switches this crate from `info` to `debug`
/// (which includes every inserted row's values).
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("csv_autoload=debug")
        } else {
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Debug-level logging captured by the test harness.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

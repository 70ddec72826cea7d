//! Logging initialization
//!
//! Thin wrapper over tracing-subscriber so binaries and tests configure
//! logging the same way. Respects `RUST_LOG`, defaulting to `info`.

use tracing_subscriber::EnvFilter;

/// Initialise logging with the default filter (`RUST_LOG` or `info`)
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init() {
    init_with_filter("info");
}

/// Initialise logging with an explicit fallback filter
pub fn init_with_filter(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

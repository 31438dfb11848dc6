//! Tracing subscriber initialization.
//!
//! JSON lines with timestamps; verbosity comes from `RUST_LOG`, e.g.
//! `RUST_LOG=stockroom_infra=debug` to see every stock movement.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call multiple times (subsequent
/// calls are no-ops).
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .with_thread_names(true)
        .try_init();
}

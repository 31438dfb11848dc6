//! Shared tracing/logging setup for stockroom binaries and tests.

/// Initialize process-wide logging with the `info` default.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init("info");
}

/// Like [`init`], with a different default directive for when `RUST_LOG`
/// is unset (tests use `warn` to keep output quiet).
pub fn init_with_default(directive: &str) {
    tracing::init(directive);
}

/// Tracing subscriber configuration (filters, formatting).
pub mod tracing;

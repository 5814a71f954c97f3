//! Tracing and logging setup shared by the storefront binaries.

/// Initialize process-wide observability (tracing/logging).
///
/// Reads `STOREFRONT_LOG_FORMAT` and `RUST_LOG`. Safe to call multiple
/// times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::{LogFormat, UnknownLogFormat};

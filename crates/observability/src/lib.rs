//! Tracing and logging setup shared by every binary and test harness.

/// Initialize process-wide tracing with the defaults (`RUST_LOG`, JSON output).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    self::tracing::init();
}

/// Subscriber configuration (filters, formatters).
pub mod tracing;

pub use self::tracing::{LogFormat, init_with};

//! Process-wide logging setup.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize logging with `default_level` as the filter when `RUST_LOG` is
/// unset.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(default_level: &str, format: LogFormat) {
    tracing::init(default_level, format);
}

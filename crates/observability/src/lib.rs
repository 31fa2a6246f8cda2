//! Process-wide tracing setup shared by the engine's binaries.

/// Initialize process-wide logging (JSON unless `JOBCRAFT_LOG_FORMAT=pretty`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init(LogFormat::from_env());
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::LogFormat;

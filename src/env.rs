//! Environment variable names read by this crate.
//!
//! Only [`crate::trace::from_env`] and [`crate::init::LoggingConfig::from_env`]
//! touch the process environment; the formatter itself receives everything
//! through its constructor.

/// Trace propagation header set by the serverless runtime,
/// e.g. `Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1`.
pub const TRACE_HEADER_ENV: &str = "_X_AMZN_TRACE_ID";

/// Log level used by [`crate::init::LoggingConfig::from_env`].
pub const LOG_LEVEL_ENV: &str = "JSONLOG_LEVEL";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

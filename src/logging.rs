//! Tracing subscriber setup for hosts embedding the content script

use anyhow::{Context, Result};
use tracing::Level as TraceLevel;
use tracing_subscriber::FmtSubscriber;

/// Map a `LOG_LEVEL` value to a tracing level, defaulting to info
pub fn parse_level(value: &str) -> TraceLevel {
    match value.trim().to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

/// Install the global fmt subscriber at the level named by `LOG_LEVEL`
pub fn init() -> Result<()> {
    let log_level = parse_level(&std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")
}

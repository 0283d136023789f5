//! Structured logging setup.
//!
//! Configurable via RUST_LOG; defaults to INFO globally with DEBUG for
//! this crate.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initializes the logging system for interactive use.
///
/// Example RUST_LOG values:
/// - `info` - all info and above
/// - `poloniex_connector=debug` - debug for this crate, default elsewhere
/// - `poloniex_connector=trace,tokio=warn`
pub fn init_telemetry() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,poloniex_connector=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .compact(),
        )
        .init();
}

/// Initializes logging with JSON output for log aggregation.
pub fn init_telemetry_json() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,poloniex_connector=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
        .init();
}

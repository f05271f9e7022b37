//! Tracing subscriber bootstrap: compact text by default, JSON on request,
//! ANSI disabled when `NO_COLOR` is set, and an `EnvFilter` that defaults to
//! the configured level but is always overridable by `RUST_LOG`.

use std::io;

use tracing::Level;
use tracing_subscriber::{
    fmt::format::format,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

use crate::LogFormat;

/// Guard object; hold onto it for the life of the process to keep any
/// non-blocking writer alive.
pub struct LoggingGuard {
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initializes the global tracing subscriber. Call this once, at the very
/// start of `main`.
pub fn init(level: Level, format_kind: LogFormat) -> LoggingGuard {
    let color_disabled = std::env::var("NO_COLOR").is_ok();
    let format_layer = tracing_subscriber::fmt::layer()
        .with_ansi(!color_disabled)
        .with_writer(io::stdout);
    let format_layer = match format_kind {
        LogFormat::Json => format_layer.event_format(format().json()).boxed(),
        LogFormat::Text => format_layer.event_format(format().compact()).boxed(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::registry()
        .with(format_layer.with_filter(filter))
        .init();
    LoggingGuard { _guard: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_as_str_round_trips_through_env_filter() {
        // EnvFilter::new must accept whatever Level::as_str produces; this
        // guards against a future tracing upgrade changing that contract.
        let _ = EnvFilter::new(Level::INFO.as_str());
    }
}

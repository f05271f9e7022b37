//! Metric registration helpers shared across the indexpilot workspace.
//!
//! A single process-wide registry, `register_*!` macros that declare a
//! lazily-initialized static metric, and a `Timer`/`StatusTimer` pair for
//! scope timing, all built on stable `prometheus::Histogram`.

use std::sync::LazyLock;

pub mod macros;
pub mod safeguards;
pub mod timer;

pub use prometheus;
pub use safeguards::SafeguardCounters;
pub use timer::{
    StatusTimer,
    Timer,
};

/// The registry every `register_*!` macro call in this workspace registers
/// against. Hand this to the hosting application's metrics exporter; this
/// crate does not serve it itself.
pub static REGISTRY: LazyLock<prometheus::Registry> = LazyLock::new(prometheus::Registry::new);

/// Renders the registry in the Prometheus text exposition format, for
/// embedding in a hosting application's own scrape endpoint.
pub fn gather_text() -> anyhow::Result<String> {
    use prometheus::{
        Encoder,
        TextEncoder,
    };
    let mut buf = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

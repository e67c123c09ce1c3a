use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing::{warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::Registry;

/// Installs the global subscriber. Unknown levels fall back to info.
pub fn init(level: &str) {
    let parsed = Level::from_str(level).ok();

    let stdout_log = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::ACTIVE)
        .pretty();
    let subscriber = Registry::default()
        .with(stdout_log)
        .with(LevelFilter::from_level(parsed.unwrap_or(Level::INFO)));

    tracing::subscriber::set_global_default(subscriber).expect("Unable to set global subscriber");

    if parsed.is_none() {
        warn!(level, "unknown log level, using info");
    }
}

//! Tracing and logging support.
//!
//! The dispatcher logs through `tracing`; this module only installs a
//! subscriber. `RUST_LOG` is honoured unless a level is configured.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "subscriber")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Multi-line, coloured.
    #[default]
    Pretty,

    /// One line per event.
    Compact,

    /// Newline-delimited JSON.
    Json,
}

impl FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(TracingFormat::Pretty),
            "compact" => Ok(TracingFormat::Compact),
            "json" => Ok(TracingFormat::Json),
            other => Err(format!(
                "unknown log format `{}` (expected pretty, compact or json)",
                other
            )),
        }
    }
}

impl fmt::Display for TracingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TracingFormat::Pretty => "pretty",
            TracingFormat::Compact => "compact",
            TracingFormat::Json => "json",
        })
    }
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directive such as `debug` or `roomcmd=trace`.
    ///
    /// If None, uses RUST_LOG or defaults to "info".
    pub level: Option<String>,

    pub format: TracingFormat,

    pub timestamps: bool,

    /// Include target module names.
    pub target: bool,

    pub thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::Pretty,
            timestamps: true,
            target: true,
            thread_ids: false,
        }
    }
}

/// Install a subscriber with default settings.
#[cfg(feature = "subscriber")]
pub fn init_subscriber() {
    init_subscriber_with_config(TracingConfig::default());
}

/// Install a subscriber.
///
/// # Panics
///
/// Panics if a global subscriber is already set.
#[cfg(feature = "subscriber")]
pub fn init_subscriber_with_config(config: TracingConfig) {
    let filter = match &config.level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_target(config.target)
        .with_thread_ids(config.thread_ids);
    let layer = match (config.format, config.timestamps) {
        (TracingFormat::Pretty, true) => layer.pretty().boxed(),
        (TracingFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (TracingFormat::Compact, true) => layer.compact().boxed(),
        (TracingFormat::Compact, false) => layer.compact().without_time().boxed(),
        (TracingFormat::Json, true) => layer.json().boxed(),
        (TracingFormat::Json, false) => layer.json().without_time().boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();
}

#[cfg(not(feature = "subscriber"))]
pub fn init_subscriber() {
    // No-op without the subscriber feature
}

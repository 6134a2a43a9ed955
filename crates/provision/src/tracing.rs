//! Tracing configuration for the provision CLI
//!
//! Diagnostics go to stderr through a `fmt` layer filtered by level (or
//! `RUST_LOG`). Structured provision events bypass that filter and are
//! rendered by [`ProvisionEventLayer`] as they are emitted.

use provision_events::{EventRenderer, ProvisionEventLayer, correlation_id};
use std::io;
pub use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, filter_fn};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Tracing output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format
    Json,
}

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above
    Info,
    /// Show warnings and above (default)
    Warn,
    /// Show errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output format for diagnostics.
    pub format: TracingFormat,
    /// Minimum level shown unless `RUST_LOG` is set.
    pub level: Level,
}

/// Filter directives covering every provision crate at `level`.
#[must_use]
pub fn default_directives(level: Level) -> String {
    let level = match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    };
    ["provision", "provision_core", "provision_pipeline", "provision_events"]
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize tracing, rendering structured events through `renderer`.
///
/// # Errors
///
/// Fails if `RUST_LOG` holds invalid directives or a global subscriber is
/// already installed.
pub fn init_tracing_with_events(
    config: TracingConfig,
    renderer: impl EventRenderer + 'static,
) -> miette::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV)
        .unwrap_or_else(|_| default_directives(config.level));
    let env_filter = EnvFilter::try_new(&directives).map_err(|e| {
        miette::miette!("Invalid tracing filter '{directives}' (from RUST_LOG or --level): {e}")
    })?;

    // Structured events are rendered separately; keep them out of the log
    let not_event = filter_fn(|metadata| !metadata.target().starts_with("provision::"));

    let registry =
        tracing_subscriber::registry().with(ProvisionEventLayer::rendering(renderer));

    let result = match config.format {
        TracingFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(io::stderr)
                .with_target(true)
                .with_filter(env_filter)
                .with_filter(not_event);
            registry.with(layer).try_init()
        }
        TracingFormat::Compact => {
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(env_filter)
                .with_filter(not_event);
            registry.with(layer).try_init()
        }
        TracingFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_current_span(true)
                .with_span_list(true)
                .with_filter(env_filter)
                .with_filter(not_event);
            registry.with(layer).try_init()
        }
    };
    result.map_err(|e| miette::miette!("Failed to install tracing subscriber: {e}"))?;

    tracing::info!(
        correlation_id = %correlation_id(),
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Tracing initialized for provision CLI"
    );

    Ok(())
}

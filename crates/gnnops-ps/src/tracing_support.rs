//! Structured logging setup
//!
//! The crates emit `tracing` events on their own; this module installs a
//! subscriber that prints them.
//!
//! # Example
//!
//! ```
//! use gnnops_ps::tracing_support::{init_tracing, TracingConfig, TracingFormat};
//!
//! let config = TracingConfig {
//!     format: TracingFormat::Compact,
//!     filter: "gnnops_ps=debug,warn".to_string(),
//!     ..Default::default()
//! };
//! let _ = init_tracing(config);
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., `RUST_LOG=debug`)
//! - `GNNOPS_LOG_FORMAT`: Set output format (`json`, `compact` or `pretty`, default: `pretty`)
//!
//! Without the `tracing` feature [`init_tracing`] installs nothing.

use anyhow::Result;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "GNNOPS_LOG_FORMAT";

/// Tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// JSON format for structured logging
    Json,
    /// Compact format (single line per event)
    Compact,
}

impl TracingFormat {
    /// Parse from string; anything unrecognized is `Pretty`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => TracingFormat::Json,
            "compact" => TracingFormat::Compact,
            _ => TracingFormat::Pretty,
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output format
    pub format: TracingFormat,
    /// Filter directive (e.g., "gnnops_ps=debug,info")
    pub filter: String,
    /// Enable ANSI colors
    pub with_ansi: bool,
    /// Show target module paths
    pub with_target: bool,
    /// Show thread IDs
    pub with_thread_ids: bool,
    /// Show file locations
    pub with_file: bool,
    /// Show line numbers
    pub with_line_number: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        let format = std::env::var(LOG_FORMAT_ENV)
            .map(|s| TracingFormat::parse(&s))
            .unwrap_or(TracingFormat::Pretty);

        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "gnnops_ps=info,gnnops_kernels=warn,warn".to_string());

        Self {
            format,
            filter,
            with_ansi: true,
            with_target: true,
            with_thread_ids: true,
            with_file: false,
            with_line_number: false,
        }
    }
}

/// Install a global subscriber for the given configuration
///
/// Call once at startup. Fails if the filter does not parse or a global
/// subscriber is already set.
#[cfg(feature = "tracing")]
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)?;

    match config.format {
        TracingFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
                .with_file(config.with_file)
                .with_line_number(config.with_line_number)
                .with_filter(filter);

            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        }
        TracingFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
                .with_file(config.with_file)
                .with_line_number(config.with_line_number)
                .with_filter(filter);

            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        }
        TracingFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
                .with_file(config.with_file)
                .with_line_number(config.with_line_number)
                .with_filter(filter);

            tracing_subscriber::registry().with(fmt_layer).try_init()?;
        }
    }

    Ok(())
}

/// Stub for when tracing feature is disabled
#[cfg(not(feature = "tracing"))]
pub fn init_tracing(_config: TracingConfig) -> Result<()> {
    Ok(())
}

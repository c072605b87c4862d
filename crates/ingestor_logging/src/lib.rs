//! Logging setup for the ingestor binary.
//!
//! Two `fmt` layers: a size-rotated file under `<home>/logs/<app>.log` and
//! stderr. `RUST_LOG` overrides the default filter for both.

mod rolling;

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use rolling::{RotationPolicy, SharedRollingWriter};

pub const DEFAULT_LOG_FILTER: &str = "ingestor=info,ingestor_sinks=info,ingestor_formats=info";

/// How the binary wants its output.
#[derive(Debug, Clone)]
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file filter on stderr even when it is chattier than `info`.
    pub verbose: bool,
    /// Only warnings and errors on stderr.
    pub quiet: bool,
    /// Overrides `<home>/logs`.
    pub log_dir: Option<PathBuf>,
}

impl<'a> LogConfig<'a> {
    pub fn new(app_name: &'a str) -> Self {
        Self {
            app_name,
            verbose: false,
            quiet: false,
            log_dir: None,
        }
    }

    fn console_filter(&self, file_filter: &str) -> EnvFilter {
        if self.quiet && !self.verbose {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new(file_filter)
        }
    }
}

fn file_filter_directives() -> String {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Initialize tracing with a rolling file writer and stderr output.
///
/// Returns the directory the log file lives in.
pub fn init_logging(config: LogConfig<'_>) -> Result<PathBuf> {
    let log_dir = match &config.log_dir {
        Some(dir) => dir.clone(),
        None => ingestor_protocol::paths::default_logs_dir(),
    };
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create logs directory: {}", log_dir.display()))?;

    let file_writer = SharedRollingWriter::new(log_dir.clone(), config.app_name, RotationPolicy::default())
        .context("Failed to initialize rolling log writer")?;

    let directives = file_filter_directives();
    let console_filter = config.console_filter(&directives);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(&directives)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(log_dir)
}

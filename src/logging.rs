// SPDX-License-Identifier: MPL-2.0

//! Structured logging via tracing.
//!
//! Targets in use: `direct` (remote calls), `archive` (the walk and the
//! retraction pass), `app` (run lifecycle). The filter comes from
//! `DMVAULT_LOG`, then `RUST_LOG`, then the default level. Without `--debug`
//! the default is `off`, so a normal run prints nothing but a fatal error.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogOutput {
    #[default]
    Stderr,
    /// Truncated at startup
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub output: LogOutput,
    /// Used when neither env var is set
    pub default_level: LevelFilter,
}

impl LogConfig {
    pub fn new(debug: bool, log_file: Option<PathBuf>) -> Self {
        Self {
            output: log_file.map(LogOutput::File).unwrap_or_default(),
            default_level: if debug {
                LevelFilter::DEBUG
            } else {
                LevelFilter::OFF
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to create log file: {0}")]
    FileCreation(#[from] io::Error),
    #[error("failed to parse log filter: {0}")]
    FilterParse(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to initialize subscriber: {0}")]
    TryInit(#[from] tracing_subscriber::util::TryInitError),
}

fn build_env_filter(default_level: LevelFilter) -> Result<EnvFilter, LoggingError> {
    for var in ["DMVAULT_LOG", "RUST_LOG"] {
        if let Ok(filter) = std::env::var(var) {
            return Ok(EnvFilter::try_new(filter)?);
        }
    }
    Ok(EnvFilter::try_new(default_directive(default_level))?)
}

/// Our own targets at `level`, dependencies one notch quieter.
fn default_directive(level: LevelFilter) -> String {
    let ours = level.to_string().to_lowercase();
    let deps = if level > LevelFilter::INFO {
        "info".to_string()
    } else {
        ours.clone()
    };
    format!("{deps},dmvault={ours},direct={ours},archive={ours},app={ours}")
}

pub fn init(config: LogConfig) -> Result<(), LoggingError> {
    let filter = build_env_filter(config.default_level)?;

    match config.output {
        LogOutput::Stderr => {
            let layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(io::stderr)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
        }
        LogOutput::File(path) => {
            let file = File::create(path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()?;
        }
    }

    Ok(())
}

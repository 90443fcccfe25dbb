//! Tracing subscriber setup.
//!
//! Logs go to stderr and, optionally, to a file written by a background
//! thread. `RUST_LOG` overrides the configured level when set.
//!
//! Keep the returned [`WorkerGuard`] alive for the life of the program;
//! dropping it flushes and stops the file writer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use time::macros::format_description;
pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events pass the configured level.
const LOG_TARGETS: &[&str] = &["releasefeed", "releasefeed_cli"];

/// Errors from [`init_logging`].
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The level or filter directive is malformed.
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    /// The log file directory could not be created.
    #[error("failed to prepare log file {}: {source}", path.display())]
    File { path: PathBuf, source: io::Error },

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level for this crate's events (`error`..`trace`).
    pub level: String,
    /// Optional log file; written without ANSI colours.
    pub file: Option<PathBuf>,
    /// Colourise stderr output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Set the level.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Also write logs to `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Enable or disable colours on stderr.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Filter directive for the configured level, e.g.
    /// `releasefeed=debug,releasefeed_cli=debug`.
    pub fn directive(&self) -> String {
        let level = self.level.trim().to_lowercase();
        LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Fails if the level is not a valid filter, the log directory cannot be
/// created, or a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directive = config.directive();
            EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter {
                directive,
                reason: e.to_string(),
            })?
        }
    };

    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(timer.clone())
        .with_ansi(config.ansi)
        .with_target(false);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let (directory, file_name) = split_log_path(path);
            std::fs::create_dir_all(&directory).map_err(|source| LoggingError::File {
                path: path.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_timer(timer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(guard)
}

fn split_log_path(path: &std::path::Path) -> (PathBuf, PathBuf) {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("releasefeed.log"));
    (directory, file_name)
}

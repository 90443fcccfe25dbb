//! CLI error type.

use std::fmt;

use releasefeed::backend::BackendError;
use releasefeed::config::ConfigError;
use releasefeed::logging::LoggingError;
use releasefeed::SourceError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Missing or invalid configuration.
    Config(String),
    /// Backend construction failed.
    Backend(BackendError),
    /// Feed resolution or download failed.
    Source(SourceError),
    /// Logging could not be initialised.
    Logging(LoggingError),
    /// The requested asset is not in the feed.
    NotFound(String),
    /// A release name that is not a plain file name.
    UnsafeFileName(String),
    /// Downloaded file does not match the expected checksum.
    ChecksumMismatch { expected: String, actual: String },
    /// The user declined a prompt.
    Aborted,
    /// Tokio runtime or terminal failure.
    Runtime(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Backend(e) => write!(f, "Backend error: {}", e),
            CliError::Source(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::NotFound(name) => write!(f, "No release named '{}' in the feed", name),
            CliError::UnsafeFileName(name) => {
                write!(f, "Refusing to save '{}': not a plain file name", name)
            }
            CliError::ChecksumMismatch { expected, actual } => write!(
                f,
                "Checksum mismatch: expected {}, got {}",
                expected, actual
            ),
            CliError::Aborted => write!(f, "Aborted"),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Backend(e) => Some(e),
            CliError::Source(e) => Some(e),
            CliError::Logging(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<BackendError> for CliError {
    fn from(e: BackendError) -> Self {
        CliError::Backend(e)
    }
}

impl From<SourceError> for CliError {
    fn from(e: SourceError) -> Self {
        CliError::Source(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(e: dialoguer::Error) -> Self {
        CliError::Runtime(e.to_string())
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Source(e) if e.is_cancelled() => 130,
            CliError::Aborted => 130,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_exit_code() {
        let err = CliError::from(SourceError::Cancelled {
            file_name: "App-1.0.0.zip".to_string(),
        });
        assert_eq!(err.exit_code(), 130);
        assert_eq!(CliError::NotFound("x".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = CliError::ChecksumMismatch {
            expected: "AA".to_string(),
            actual: "BB".to_string(),
        };
        assert_eq!(err.to_string(), "Checksum mismatch: expected AA, got BB");
    }
}

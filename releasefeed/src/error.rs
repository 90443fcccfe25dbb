//! Error types for feed resolution and artifact downloads.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;
use crate::checksum::ChecksumError;
use crate::version::VersionError;

/// Result type for update-source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors surfaced by the update source.
///
/// `UnparsableVersion` is recovered locally by the feed resolver (the entry is
/// skipped); every other variant propagates to the caller.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A file name does not follow the `<id>-<semver>.<ext>` convention.
    #[error("could not parse version from file name '{file_name}': {reason}")]
    UnparsableVersion { file_name: String, reason: String },

    /// The backend listing failed (transport, authentication, status).
    #[error("backend unavailable while listing '{container}': {source}")]
    BackendUnavailable {
        container: String,
        #[source]
        source: BackendError,
    },

    /// The asset was never produced by a feed resolution on this source.
    #[error("no backend identifier for '{file_name}'; resolve the feed first")]
    UnknownArtifact { file_name: String },

    /// The backend reported a failure while transferring bytes.
    #[error("download of '{file_name}' failed: {reason}")]
    DownloadFailed { file_name: String, reason: String },

    /// The caller cancelled the download.
    #[error("download of '{file_name}' was cancelled")]
    Cancelled { file_name: String },

    /// Local disk or digest failure.
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SourceError {
    /// Whether this error is a caller-requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<VersionError> for SourceError {
    fn from(e: VersionError) -> Self {
        match e {
            VersionError::MissingDelimiter { file_name } => Self::UnparsableVersion {
                file_name,
                reason: "no hyphen-delimited version segment".to_string(),
            },
            VersionError::InvalidVersion { file_name, reason } => {
                Self::UnparsableVersion { file_name, reason }
            }
        }
    }
}

impl From<ChecksumError> for SourceError {
    fn from(e: ChecksumError) -> Self {
        match e {
            ChecksumError::Read { path, source } => Self::Io { path, source },
        }
    }
}

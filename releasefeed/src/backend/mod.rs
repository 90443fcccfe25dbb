//! Storage backend abstraction.
//!
//! A backend is any store exposing a listable collection of named, sized
//! files and a way to stream one of them. The update source only talks to
//! backends through [`StorageBackend`], so tests and alternative stores plug
//! in without touching feed resolution or downloads.
//!
//! # Transfer Events
//!
//! Downloads are modelled as a stream of tagged [`TransferEvent`]s rather
//! than a callback that may fail mid-stream:
//!
//! ```text
//! Downloading { chunk, bytes_transferred }*  then  Completed { .. }
//!                                            or    Failed { .. }
//! ```
//!
//! A stream that ends without a terminal event is treated as a failed
//! transfer by the downloader.
//!
//! # Implementations
//!
//! - [`GoogleDriveBackend`] - Google Drive v3 folder over HTTPS
//! - [`LocalDirectoryBackend`] - directory on the local filesystem
//! - `MemoryBackend` - scripted in-memory store (feature `test-support`)

mod drive;
mod local;
#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use drive::{DriveCredential, GoogleDriveBackend, DRIVE_API_BASE};
pub use local::LocalDirectoryBackend;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryBackend;

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use thiserror::Error;

use crate::identity::ArtifactId;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Stream of transfer events for one artifact.
pub type ByteSource = BoxStream<'static, TransferEvent>;

/// Errors reported by storage backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network or client failure before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend response could not be understood.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    /// The container or artifact does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Local I/O failure (filesystem backends).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A file or container listed by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEntry {
    /// File name as stored by the backend.
    pub name: String,
    /// Backend identifier used to open the file.
    pub id: ArtifactId,
    /// Declared size in bytes, if the backend reports one.
    pub size: Option<u64>,
    /// Whether this entry is a folder rather than a file.
    pub is_container: bool,
}

impl BackendEntry {
    /// Create a file entry.
    pub fn file(name: impl Into<String>, id: impl Into<ArtifactId>, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            size,
            is_container: false,
        }
    }

    /// Create a container (folder) entry.
    pub fn container(name: impl Into<String>, id: impl Into<ArtifactId>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            size: None,
            is_container: true,
        }
    }
}

/// Progress notification from an in-flight transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// A chunk arrived; `bytes_transferred` includes it.
    Downloading { chunk: Bytes, bytes_transferred: u64 },
    /// All bytes were delivered.
    Completed { bytes_transferred: u64 },
    /// The transfer failed; no further events follow.
    Failed {
        bytes_transferred: u64,
        reason: String,
    },
}

impl TransferEvent {
    /// Bytes delivered so far.
    pub fn bytes_transferred(&self) -> u64 {
        match self {
            Self::Downloading {
                bytes_transferred, ..
            }
            | Self::Completed { bytes_transferred }
            | Self::Failed {
                bytes_transferred, ..
            } => *bytes_transferred,
        }
    }
}

/// Listing and streaming capability of an artifact store.
///
/// Implementations must be `Send + Sync` so one backend can serve
/// concurrent feed resolutions and downloads.
pub trait StorageBackend: Send + Sync {
    /// Short name for logs (e.g. "drive", "local").
    fn name(&self) -> &str;

    /// List the file entries directly under a container.
    ///
    /// Backends filter out folders when the store allows it; entries marked
    /// as containers are ignored by callers either way.
    fn list_files<'a>(
        &'a self,
        container: &'a str,
    ) -> BoxFuture<'a, Result<Vec<BackendEntry>, BackendError>>;

    /// Open a read stream for an artifact.
    ///
    /// Dropping the returned stream aborts the transfer.
    fn open_read<'a>(&'a self, id: &'a ArtifactId) -> BoxFuture<'a, Result<ByteSource, BackendError>>;
}

impl fmt::Debug for dyn StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBackend")
            .field("name", &self.name())
            .finish()
    }
}

/// Adapt a stream of byte chunks into transfer events.
///
/// Emits one `Downloading` event per chunk, then `Completed` when the
/// source ends, or `Failed` on the first error.
pub fn transfer_events<S, E>(chunks: S) -> ByteSource
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send,
{
    struct State<S> {
        chunks: Pin<Box<S>>,
        transferred: u64,
        finished: bool,
    }

    let initial = State {
        chunks: Box::pin(chunks),
        transferred: 0,
        finished: false,
    };

    stream::unfold(initial, |mut state| async move {
        if state.finished {
            return None;
        }
        let event = match state.chunks.next().await {
            Some(Ok(chunk)) => {
                state.transferred += chunk.len() as u64;
                TransferEvent::Downloading {
                    chunk,
                    bytes_transferred: state.transferred,
                }
            }
            Some(Err(e)) => {
                state.finished = true;
                TransferEvent::Failed {
                    bytes_transferred: state.transferred,
                    reason: e.to_string(),
                }
            }
            None => {
                state.finished = true;
                TransferEvent::Completed {
                    bytes_transferred: state.transferred,
                }
            }
        };
        Some((event, state))
    })
    .boxed()
}

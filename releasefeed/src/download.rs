//! Artifact downloads.
//!
//! Streams one artifact from the backend into a local file, reports
//! percentage progress, honours cancellation, and attaches a digest of the
//! written file to the asset on success.
//!
//! # Lifecycle
//!
//! Each call walks the [`DownloadPhase`] machine. A transfer that fails or
//! is cancelled never reaches `Verifying`, so the asset keeps no checksum.
//! The destination is truncated up front and never resumed; a partial file
//! left behind by a failed call must be discarded by the caller.

use std::io;
use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::asset::ReleaseAsset;
use crate::backend::{StorageBackend, TransferEvent};
use crate::checksum::ChecksumComputer;
use crate::error::{SourceError, SourceResult};
use crate::identity::{ArtifactId, IdentityMap};
use crate::progress::ProgressReporter;
use crate::state::DownloadPhase;

/// Write buffer for the destination file (256KB).
const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Downloads artifacts previously resolved into an [`IdentityMap`].
pub struct ArtifactDownloader {
    backend: Arc<dyn StorageBackend>,
    identities: Arc<IdentityMap>,
    checksum: Arc<dyn ChecksumComputer>,
}

impl ArtifactDownloader {
    /// Create a downloader reading identities from `identities`.
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        identities: Arc<IdentityMap>,
        checksum: Arc<dyn ChecksumComputer>,
    ) -> Self {
        Self {
            backend,
            identities,
            checksum,
        }
    }

    /// Download `asset` to `destination`.
    ///
    /// `on_progress` receives percentages of `asset.size_bytes` as bytes
    /// arrive and exactly 100 once the transfer completes. It runs inline on
    /// the transfer loop and must not block.
    ///
    /// On success `asset.checksum` holds the digest of the written file.
    /// Any existing checksum is cleared before the destination is touched.
    ///
    /// # Errors
    ///
    /// - [`SourceError::UnknownArtifact`] if no feed resolution produced the
    ///   file name; the backend is not contacted
    /// - [`SourceError::DownloadFailed`] if the backend fails the transfer
    /// - [`SourceError::Cancelled`] if `cancel` fires first
    /// - [`SourceError::Io`] on local write or digest failure
    pub async fn download(
        &self,
        asset: &mut ReleaseAsset,
        destination: &Path,
        on_progress: &(dyn Fn(u8) + Send + Sync),
        cancel: &CancellationToken,
    ) -> SourceResult<()> {
        // Captured before any await so a concurrent re-resolve cannot swap it
        let id = self
            .identities
            .get(&asset.file_name)
            .ok_or_else(|| SourceError::UnknownArtifact {
                file_name: asset.file_name.clone(),
            })?;

        asset.checksum = None;
        let mut phase = PhaseLog::new(&asset.file_name);

        phase.advance(DownloadPhase::Transferring);
        let transferred = self
            .transfer(&id, asset, destination, on_progress, cancel)
            .await;
        let bytes = match transferred {
            Ok(bytes) => {
                phase.advance(DownloadPhase::Completed);
                bytes
            }
            Err(e) => {
                phase.advance(if e.is_cancelled() {
                    DownloadPhase::Cancelled
                } else {
                    DownloadPhase::Failed
                });
                return Err(e);
            }
        };

        phase.advance(DownloadPhase::Verifying);
        match self.verify(destination).await {
            Ok(digest) => {
                phase.advance(DownloadPhase::Verified);
                info!(
                    file = %asset.file_name,
                    bytes,
                    checksum = %digest,
                    "Download verified"
                );
                asset.checksum = Some(digest);
                Ok(())
            }
            Err(e) => {
                phase.advance(DownloadPhase::VerifyFailed);
                warn!(file = %asset.file_name, error = %e, "Checksum failed");
                Err(e)
            }
        }
    }

    /// Stream the artifact into `destination`, returning bytes written.
    async fn transfer(
        &self,
        id: &ArtifactId,
        asset: &ReleaseAsset,
        destination: &Path,
        on_progress: &(dyn Fn(u8) + Send + Sync),
        cancel: &CancellationToken,
    ) -> SourceResult<u64> {
        let file_name = asset.file_name.as_str();
        let cancelled = || SourceError::Cancelled {
            file_name: file_name.to_string(),
        };
        let failed = |reason: String| SourceError::DownloadFailed {
            file_name: file_name.to_string(),
            reason,
        };

        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let mut writer = open_destination(destination).await?;

        let mut source = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            opened = self.backend.open_read(id) => opened.map_err(|e| failed(e.to_string()))?,
        };

        let mut progress = ProgressReporter::new(asset.size_bytes, on_progress);
        let mut written = 0u64;

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(file = %file_name, written, "Transfer cancelled");
                    return Err(cancelled());
                }
                event = source.next() => event,
            };

            match event {
                Some(TransferEvent::Downloading {
                    chunk,
                    bytes_transferred,
                }) => {
                    writer
                        .write_all(&chunk)
                        .await
                        .map_err(|e| SourceError::io(destination, e))?;
                    written += chunk.len() as u64;
                    progress.transferred(bytes_transferred);
                }
                Some(TransferEvent::Completed { bytes_transferred }) => {
                    writer
                        .flush()
                        .await
                        .map_err(|e| SourceError::io(destination, e))?;
                    drop(writer);

                    if asset.size_bytes != 0 && bytes_transferred != asset.size_bytes {
                        warn!(
                            file = %file_name,
                            declared = asset.size_bytes,
                            transferred = bytes_transferred,
                            "Transferred size differs from listing"
                        );
                    }
                    progress.completed();
                    return Ok(written);
                }
                Some(TransferEvent::Failed {
                    bytes_transferred,
                    reason,
                }) => {
                    warn!(
                        file = %file_name,
                        bytes_transferred,
                        reason = %reason,
                        "Backend failed transfer"
                    );
                    return Err(failed(reason));
                }
                None => {
                    return Err(failed(format!(
                        "stream ended after {} bytes without completing",
                        written
                    )));
                }
            }
        }
    }

    /// Digest the closed destination file on a blocking thread.
    async fn verify(&self, destination: &Path) -> SourceResult<String> {
        let checksum = Arc::clone(&self.checksum);
        let path = destination.to_path_buf();

        tokio::task::spawn_blocking(move || checksum.compute(&path))
            .await
            .map_err(|e| {
                SourceError::io(destination, io::Error::new(io::ErrorKind::Other, e.to_string()))
            })?
            .map_err(SourceError::from)
    }
}

/// Create parent directories and open `path` truncated for writing.
async fn open_destination(path: &Path) -> SourceResult<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| SourceError::io(parent, e))?;
    }
    let file = File::create(path)
        .await
        .map_err(|e| SourceError::io(path, e))?;
    Ok(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file))
}

/// Tracks and logs the phase of one download.
struct PhaseLog<'a> {
    file_name: &'a str,
    phase: DownloadPhase,
}

impl<'a> PhaseLog<'a> {
    fn new(file_name: &'a str) -> Self {
        Self {
            file_name,
            phase: DownloadPhase::Idle,
        }
    }

    fn advance(&mut self, next: DownloadPhase) {
        match self.phase.advance(next) {
            Ok(phase) => {
                debug!(file = %self.file_name, from = %self.phase, to = %phase, "Download phase");
                self.phase = phase;
            }
            Err(e) => warn!(file = %self.file_name, error = %e, "Ignoring phase change"),
        }
    }
}

//! Local directory backend.
//!
//! Serves release artifacts from a directory tree, e.g. a mounted network
//! share or a build output folder. Containers are subdirectories of the root
//! and artifact identifiers are paths relative to the root.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::warn;

use super::{transfer_events, BackendEntry, BackendError, BoxFuture, ByteSource, StorageBackend};
use crate::identity::ArtifactId;

/// Default read chunk size (64KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Directory-backed artifact store.
#[derive(Debug, Clone)]
pub struct LocalDirectoryBackend {
    root: PathBuf,
    chunk_size: usize,
}

impl LocalDirectoryBackend {
    /// Create a backend rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the read chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path under the root, rejecting escapes.
    fn resolve(&self, relative: &str) -> Result<PathBuf, BackendError> {
        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(BackendError::NotFound(format!(
                "{} is outside the backend root",
                relative.display()
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn list_dir(&self, container: &str) -> Result<Vec<BackendEntry>, BackendError> {
        let dir = self.resolve(container)?;
        let mut reader = fs::read_dir(&dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::NotFound(dir.display().to_string())
            } else {
                BackendError::Io(e)
            }
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            // follow symlinks so linked artifacts are listed
            let metadata = match fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %entry.path().display(), "Skipping file with non-UTF-8 name");
                continue;
            };
            let id = relative_id(container, &name);
            entries.push(BackendEntry::file(name, id, Some(metadata.len())));
        }

        // read_dir order is platform dependent
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn open_file(&self, id: &ArtifactId) -> Result<ByteSource, BackendError> {
        let path = self.resolve(id.as_str())?;
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::NotFound(path.display().to_string())
            } else {
                BackendError::Io(e)
            }
        })?;

        Ok(transfer_events(ReaderStream::with_capacity(
            file,
            self.chunk_size,
        )))
    }
}

/// Identifier for a file in a container, always `/`-separated.
fn relative_id(container: &str, name: &str) -> ArtifactId {
    let container = container.trim_matches('/');
    if container.is_empty() || container == "." {
        ArtifactId::new(name)
    } else {
        ArtifactId::new(format!("{}/{}", container, name))
    }
}

impl StorageBackend for LocalDirectoryBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn list_files<'a>(
        &'a self,
        container: &'a str,
    ) -> BoxFuture<'a, Result<Vec<BackendEntry>, BackendError>> {
        Box::pin(self.list_dir(container))
    }

    fn open_read<'a>(&'a self, id: &'a ArtifactId) -> BoxFuture<'a, Result<ByteSource, BackendError>> {
        Box::pin(self.open_file(id))
    }
}

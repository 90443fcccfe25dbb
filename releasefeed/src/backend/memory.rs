//! Scripted in-memory backend for tests.
//!
//! Holds listings and payloads in memory, counts calls, and can be told to
//! fail a listing, fail a transfer part-way, or stall a transfer so a test
//! can cancel it mid-flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;

use super::{BackendEntry, BackendError, BoxFuture, ByteSource, StorageBackend, TransferEvent};
use crate::identity::ArtifactId;

/// Default chunk size for scripted transfers.
const DEFAULT_CHUNK_SIZE: usize = 16;

/// How a scripted transfer ends early.
#[derive(Debug, Clone)]
enum Interruption {
    Fail { after_chunks: usize, reason: String },
    Stall { after_chunks: usize },
}

/// In-memory [`StorageBackend`] with call counters.
#[derive(Debug)]
pub struct MemoryBackend {
    chunk_size: usize,
    listings: Mutex<HashMap<String, Vec<BackendEntry>>>,
    payloads: Mutex<HashMap<ArtifactId, Bytes>>,
    interruptions: Mutex<HashMap<ArtifactId, Interruption>>,
    listing_failure: Mutex<Option<String>>,
    list_calls: AtomicUsize,
    open_calls: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            listings: Mutex::new(HashMap::new()),
            payloads: Mutex::new(HashMap::new()),
            interruptions: Mutex::new(HashMap::new()),
            listing_failure: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            open_calls: AtomicUsize::new(0),
        }
    }

    /// Set the size of each scripted chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Add a file whose declared size matches its payload.
    pub fn add_file(&self, container: &str, name: &str, id: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let size = Some(data.len() as u64);
        self.add_file_with_declared_size(container, name, id, data, size);
    }

    /// Add a file with an explicit declared size (`None` = not reported).
    pub fn add_file_with_declared_size(
        &self,
        container: &str,
        name: &str,
        id: &str,
        data: impl Into<Bytes>,
        declared_size: Option<u64>,
    ) {
        let id = ArtifactId::new(id);
        self.listings
            .lock()
            .entry(container.to_string())
            .or_default()
            .push(BackendEntry::file(name, id.clone(), declared_size));
        self.payloads.lock().insert(id, data.into());
    }

    /// Add a folder entry to a listing.
    pub fn add_folder(&self, container: &str, name: &str, id: &str) {
        self.listings
            .lock()
            .entry(container.to_string())
            .or_default()
            .push(BackendEntry::container(name, id));
    }

    /// Remove every entry with this name from a listing.
    pub fn remove_file(&self, container: &str, name: &str) {
        if let Some(entries) = self.listings.lock().get_mut(container) {
            entries.retain(|e| e.name != name);
        }
    }

    /// Replace the payload served for an identifier.
    pub fn set_payload(&self, id: &str, data: impl Into<Bytes>) {
        self.payloads.lock().insert(ArtifactId::new(id), data.into());
    }

    /// Make every listing fail with a transport error.
    pub fn fail_listing(&self, reason: &str) {
        *self.listing_failure.lock() = Some(reason.to_string());
    }

    /// Make the transfer of `id` fail after `after_chunks` chunks.
    pub fn fail_transfer_after(&self, id: &str, after_chunks: usize, reason: &str) {
        self.interruptions.lock().insert(
            ArtifactId::new(id),
            Interruption::Fail {
                after_chunks,
                reason: reason.to_string(),
            },
        );
    }

    /// Make the transfer of `id` hang forever after `after_chunks` chunks.
    pub fn stall_transfer_after(&self, id: &str, after_chunks: usize) {
        self.interruptions
            .lock()
            .insert(ArtifactId::new(id), Interruption::Stall { after_chunks });
    }

    /// Number of `list_files` calls so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `open_read` calls so far.
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    fn scripted_events(&self, data: &Bytes, interruption: Option<Interruption>) -> ByteSource {
        let limit = match &interruption {
            Some(Interruption::Fail { after_chunks, .. })
            | Some(Interruption::Stall { after_chunks }) => Some(*after_chunks),
            None => None,
        };

        let mut events = Vec::new();
        let mut transferred = 0u64;
        let mut offset = 0usize;
        while offset < data.len() && limit.map_or(true, |l| events.len() < l) {
            let end = (offset + self.chunk_size).min(data.len());
            let chunk = data.slice(offset..end);
            transferred += chunk.len() as u64;
            events.push(TransferEvent::Downloading {
                chunk,
                bytes_transferred: transferred,
            });
            offset = end;
        }

        match interruption {
            None => {
                events.push(TransferEvent::Completed {
                    bytes_transferred: transferred,
                });
                stream::iter(events).boxed()
            }
            Some(Interruption::Fail { reason, .. }) => {
                events.push(TransferEvent::Failed {
                    bytes_transferred: transferred,
                    reason,
                });
                stream::iter(events).boxed()
            }
            Some(Interruption::Stall { .. }) => {
                stream::iter(events).chain(stream::pending()).boxed()
            }
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_files<'a>(
        &'a self,
        container: &'a str,
    ) -> BoxFuture<'a, Result<Vec<BackendEntry>, BackendError>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(reason) = self.listing_failure.lock().clone() {
                return Err(BackendError::Transport(reason));
            }
            self.listings
                .lock()
                .get(container)
                .cloned()
                .ok_or_else(|| BackendError::NotFound(container.to_string()))
        })
    }

    fn open_read<'a>(&'a self, id: &'a ArtifactId) -> BoxFuture<'a, Result<ByteSource, BackendError>> {
        Box::pin(async move {
            self.open_calls.fetch_add(1, Ordering::SeqCst);
            let data = self
                .payloads
                .lock()
                .get(id)
                .cloned()
                .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
            let interruption = self.interruptions.lock().get(id).cloned();
            Ok(self.scripted_events(&data, interruption))
        })
    }
}

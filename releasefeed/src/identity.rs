//! Mapping from resolved file names to backend artifact identifiers.
//!
//! Feed resolution fills the map; downloads read it. Backends address files
//! by opaque identifiers (Drive file ids, relative paths), while callers only
//! hold the normalized file name from the feed.
//!
//! The map is owned by one update source. It is never persisted and never
//! expires; a download must be preceded by a feed resolution on the same
//! source.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Backend-specific identifier of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Wrap a backend identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ArtifactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Thread-safe `file_name -> ArtifactId` map.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: RwLock<HashMap<String, ArtifactId>>,
}

impl IdentityMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the identifier for a file name.
    pub fn upsert(&self, file_name: impl Into<String>, id: ArtifactId) {
        self.entries.write().insert(file_name.into(), id);
    }

    /// Replace the whole map with the given entries.
    ///
    /// Entries not present in `entries` are evicted. The swap happens under a
    /// single write lock, so readers see either the old or the new map.
    pub fn replace_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, ArtifactId)>,
    {
        let fresh: HashMap<_, _> = entries.into_iter().collect();
        *self.entries.write() = fresh;
    }

    /// Upsert every entry, keeping entries not mentioned.
    pub fn extend<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, ArtifactId)>,
    {
        self.entries.write().extend(entries);
    }

    /// Look up the identifier for a file name.
    pub fn get(&self, file_name: &str) -> Option<ArtifactId> {
        self.entries.read().get(file_name).cloned()
    }

    /// Whether the file name has an identifier.
    pub fn contains(&self, file_name: &str) -> bool {
        self.entries.read().contains_key(file_name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// All mapped file names, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }
}

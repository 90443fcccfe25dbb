//! Feed resolution.
//!
//! Lists the configured container, turns every well-named file into a
//! [`ReleaseAsset`], and records each file's backend identifier so a later
//! download can open it without listing again.
//!
//! Resolution degrades rather than fails: a file whose name carries no
//! parsable version, or that is not a plain file name (path separators,
//! `.`/`..`), is skipped with a warning. Only a failed listing
//! surfaces as an error, and it leaves the identity map untouched.

use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::asset::{ReleaseAsset, ReleaseFeed};
use crate::backend::{BackendEntry, StorageBackend};
use crate::config::SourceConfig;
use crate::error::{SourceError, SourceResult};
use crate::identity::{ArtifactId, IdentityMap};
use crate::version::parse_version;

/// Resolves release feeds from a storage backend.
pub struct FeedResolver {
    backend: Arc<dyn StorageBackend>,
    identities: Arc<IdentityMap>,
    config: Arc<SourceConfig>,
}

impl FeedResolver {
    /// Create a resolver writing identities into `identities`.
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        identities: Arc<IdentityMap>,
        config: Arc<SourceConfig>,
    ) -> Self {
        Self {
            backend,
            identities,
            config,
        }
    }

    /// Resolve the current feed.
    ///
    /// `channel`, `staging_id` and `latest_local_release` are accepted for
    /// callers that drive staged rollouts. Storage backends have no notion of
    /// either, so they are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::BackendUnavailable`] if the listing fails.
    pub async fn resolve(
        &self,
        channel: &str,
        staging_id: Option<Uuid>,
        latest_local_release: Option<&ReleaseAsset>,
    ) -> SourceResult<ReleaseFeed> {
        let container = &self.config.container_id;
        debug!(
            backend = self.backend.name(),
            container = %container,
            channel = %channel,
            staging_id = ?staging_id,
            latest_local = ?latest_local_release.map(|a| a.version.to_string()),
            "Resolving release feed"
        );

        let entries = self.backend.list_files(container).await.map_err(|e| {
            warn!(
                backend = self.backend.name(),
                container = %container,
                error = %e,
                "Listing failed"
            );
            SourceError::BackendUnavailable {
                container: container.clone(),
                source: e,
            }
        })?;

        let resolved = assemble(&self.config.package_id, entries);

        if self.config.evict_stale_identities {
            self.identities.replace_all(resolved.identities);
        } else {
            self.identities.extend(resolved.identities);
        }

        info!(
            container = %container,
            assets = resolved.feed.len(),
            skipped = resolved.skipped,
            "Resolved release feed"
        );
        Ok(resolved.feed)
    }
}

struct Resolved {
    feed: ReleaseFeed,
    identities: Vec<(String, ArtifactId)>,
    skipped: usize,
}

/// Build the feed and identity entries from a listing, in listing order.
fn assemble(package_id: &str, entries: Vec<BackendEntry>) -> Resolved {
    let mut assets = Vec::with_capacity(entries.len());
    let mut identities = Vec::with_capacity(entries.len());
    let mut seen = HashSet::new();
    let mut skipped = 0;

    for entry in entries {
        if entry.is_container {
            continue;
        }

        // Names become local paths on download
        if !is_plain_file_name(&entry.name) {
            warn!(file = %entry.name, id = %entry.id, "Skipping entry with a path in its name");
            skipped += 1;
            continue;
        }

        let version = match parse_version(&entry.name) {
            Ok(version) => version,
            Err(e) => {
                warn!(file = %entry.name, error = %e, "Skipping entry without a version");
                skipped += 1;
                continue;
            }
        };

        // File names key the identity map; a second entry would be unreachable
        if !seen.insert(entry.name.clone()) {
            warn!(file = %entry.name, id = %entry.id, "Skipping duplicate file name");
            skipped += 1;
            continue;
        }

        let size = entry.size.unwrap_or(0);
        assets.push(ReleaseAsset::new(package_id, entry.name.clone(), version, size));
        identities.push((entry.name, entry.id));
    }

    Resolved {
        feed: ReleaseFeed::new(assets),
        identities,
        skipped,
    }
}

/// True when `name` is a single normal path component on every platform.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

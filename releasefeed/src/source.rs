//! Update source facade.
//!
//! [`UpdateSource`] is the interface an installer talks to: resolve a feed,
//! then download one of its assets. [`BackendUpdateSource`] implements it on
//! top of any [`StorageBackend`], wiring a [`FeedResolver`] and an
//! [`ArtifactDownloader`] to one shared [`IdentityMap`].
//!
//! # Example
//!
//! ```ignore
//! let backend = Arc::new(LocalDirectoryBackend::new("/srv/artifacts"));
//! let source = BackendUpdateSource::new(backend, SourceConfig::new("App", "releases"));
//!
//! let feed = source.resolve_feed("stable", None, None).await?;
//! let mut asset = feed.latest().cloned().unwrap();
//! source
//!     .download(&mut asset, Path::new("App.zip"), &|p| println!("{p}%"), &cancel)
//!     .await?;
//! assert!(asset.is_verified());
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::asset::{ReleaseAsset, ReleaseFeed};
use crate::backend::{BoxFuture, StorageBackend};
use crate::checksum::ChecksumComputer;
use crate::config::SourceConfig;
use crate::download::ArtifactDownloader;
use crate::error::SourceResult;
use crate::feed::FeedResolver;
use crate::identity::IdentityMap;

/// A place release feeds come from and artifacts download from.
///
/// Object-safe so installers can hold `Arc<dyn UpdateSource>`.
pub trait UpdateSource: Send + Sync {
    /// Resolve the current release feed.
    fn get_release_feed<'a>(
        &'a self,
        channel: &'a str,
        staging_id: Option<Uuid>,
        latest_local_release: Option<&'a ReleaseAsset>,
    ) -> BoxFuture<'a, SourceResult<ReleaseFeed>>;

    /// Download an asset from the most recently resolved feed.
    ///
    /// Sets `asset.checksum` on success.
    fn download_release_entry<'a>(
        &'a self,
        asset: &'a mut ReleaseAsset,
        local_file: &'a Path,
        on_progress: &'a (dyn Fn(u8) + Send + Sync),
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, SourceResult<()>>;
}

/// [`UpdateSource`] backed by a [`StorageBackend`].
pub struct BackendUpdateSource {
    backend: Arc<dyn StorageBackend>,
    config: Arc<SourceConfig>,
    identities: Arc<IdentityMap>,
    resolver: FeedResolver,
    downloader: ArtifactDownloader,
}

impl BackendUpdateSource {
    /// Create a source using the configured digest algorithm.
    pub fn new(backend: Arc<dyn StorageBackend>, config: SourceConfig) -> Self {
        let checksum: Arc<dyn ChecksumComputer> = Arc::new(config.digest);
        Self::with_checksum(backend, config, checksum)
    }

    /// Create a source with a custom checksum computer.
    pub fn with_checksum(
        backend: Arc<dyn StorageBackend>,
        config: SourceConfig,
        checksum: Arc<dyn ChecksumComputer>,
    ) -> Self {
        let config = Arc::new(config);
        let identities = Arc::new(IdentityMap::new());
        let resolver = FeedResolver::new(
            Arc::clone(&backend),
            Arc::clone(&identities),
            Arc::clone(&config),
        );
        let downloader =
            ArtifactDownloader::new(Arc::clone(&backend), Arc::clone(&identities), checksum);

        Self {
            backend,
            config,
            identities,
            resolver,
            downloader,
        }
    }

    /// Resolve the current release feed.
    pub async fn resolve_feed(
        &self,
        channel: &str,
        staging_id: Option<Uuid>,
        latest_local_release: Option<&ReleaseAsset>,
    ) -> SourceResult<ReleaseFeed> {
        self.resolver
            .resolve(channel, staging_id, latest_local_release)
            .await
    }

    /// Download an asset from the most recently resolved feed.
    pub async fn download(
        &self,
        asset: &mut ReleaseAsset,
        destination: &Path,
        on_progress: &(dyn Fn(u8) + Send + Sync),
        cancel: &CancellationToken,
    ) -> SourceResult<()> {
        self.downloader
            .download(asset, destination, on_progress, cancel)
            .await
    }

    /// The backend this source reads from.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Source configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Identifiers recorded by feed resolution.
    pub fn identities(&self) -> &IdentityMap {
        &self.identities
    }
}

impl UpdateSource for BackendUpdateSource {
    fn get_release_feed<'a>(
        &'a self,
        channel: &'a str,
        staging_id: Option<Uuid>,
        latest_local_release: Option<&'a ReleaseAsset>,
    ) -> BoxFuture<'a, SourceResult<ReleaseFeed>> {
        Box::pin(self.resolve_feed(channel, staging_id, latest_local_release))
    }

    fn download_release_entry<'a>(
        &'a self,
        asset: &'a mut ReleaseAsset,
        local_file: &'a Path,
        on_progress: &'a (dyn Fn(u8) + Send + Sync),
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, SourceResult<()>> {
        Box::pin(self.download(asset, local_file, on_progress, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[tokio::test]
    async fn test_resolver_and_downloader_share_identities() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_file("root", "App-1.0.0.zip", "f1", b"abc".to_vec());
        let source = BackendUpdateSource::new(backend, SourceConfig::new("App", "root"));

        assert!(source.identities().is_empty());
        source.resolve_feed("", None, None).await.unwrap();
        assert!(source.identities().contains("App-1.0.0.zip"));
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let temp = tempfile::TempDir::new().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        backend.add_file("root", "App-1.0.0.zip", "f1", b"abc".to_vec());
        let source: Arc<dyn UpdateSource> =
            Arc::new(BackendUpdateSource::new(backend, SourceConfig::new("App", "root")));

        let feed = source.get_release_feed("", None, None).await.unwrap();
        let mut asset = feed.assets()[0].clone();
        source
            .download_release_entry(
                &mut asset,
                &temp.path().join("App-1.0.0.zip"),
                &|_: u8| {},
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(asset.is_verified());
    }
}

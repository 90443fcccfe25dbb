//! Configuration for a single update source.

use crate::checksum::DigestAlgorithm;

/// Configuration for an update source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Product family identifier stamped on every asset.
    pub package_id: String,

    /// Backend container (Drive folder id, directory) holding the releases.
    pub container_id: String,

    /// Digest attached to downloaded assets.
    pub digest: DigestAlgorithm,

    /// Whether a feed resolution drops identities of files that vanished.
    ///
    /// When false, identities are only ever added or overwritten.
    pub evict_stale_identities: bool,
}

impl SourceConfig {
    /// Create a configuration with default digest and eviction settings.
    pub fn new(package_id: impl Into<String>, container_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            container_id: container_id.into(),
            digest: DigestAlgorithm::default(),
            evict_stale_identities: true,
        }
    }

    /// Set the digest algorithm.
    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    /// Enable or disable eviction of stale identities.
    pub fn with_evict_stale_identities(mut self, evict: bool) -> Self {
        self.evict_stale_identities = evict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SourceConfig::new("App", "folder-id");
        assert_eq!(config.package_id, "App");
        assert_eq!(config.container_id, "folder-id");
        assert_eq!(config.digest, DigestAlgorithm::Sha1);
        assert!(config.evict_stale_identities);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SourceConfig::new("App", "folder-id")
            .with_digest(DigestAlgorithm::Sha256)
            .with_evict_stale_identities(false);

        assert_eq!(config.digest, DigestAlgorithm::Sha256);
        assert!(!config.evict_stale_identities);
    }
}

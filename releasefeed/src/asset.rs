//! Release asset and feed types.
//!
//! # Serialized Form
//!
//! Feeds serialize to the JSON shape legacy update clients read:
//!
//! ```text
//! {
//!   "Assets": [
//!     {
//!       "PackageId": "App",
//!       "Version": "1.2.3",
//!       "Type": "Full",
//!       "FileName": "App-1.2.3.zip",
//!       "SHA1": null,
//!       "Size": 1000
//!     }
//!   ]
//! }
//! ```

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

/// Kind of release artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    /// Complete installable package.
    #[default]
    Full,
    /// Patch against a previous release. Never produced by feed resolution.
    Delta,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Delta => write!(f, "delta"),
        }
    }
}

/// A single release artifact available from a backend.
///
/// Assets are created by feed resolution. The only mutation afterwards is
/// the checksum attached by a completed download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseAsset {
    /// Product family identifier.
    pub package_id: String,
    /// Semantic version parsed from the file name.
    pub version: Version,
    /// Artifact kind.
    #[serde(rename = "Type")]
    pub kind: AssetKind,
    /// Remote file name; unique within a feed.
    pub file_name: String,
    /// Digest of the downloaded copy, absent until a download completes.
    #[serde(rename = "SHA1")]
    pub checksum: Option<String>,
    /// Size declared by the backend listing, 0 if unknown.
    #[serde(rename = "Size")]
    pub size_bytes: u64,
}

impl ReleaseAsset {
    /// Create a full asset with no checksum.
    pub fn new(
        package_id: impl Into<String>,
        file_name: impl Into<String>,
        version: Version,
        size_bytes: u64,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            version,
            kind: AssetKind::Full,
            file_name: file_name.into(),
            checksum: None,
            size_bytes,
        }
    }

    /// Whether a download of this asset completed and was digested.
    pub fn is_verified(&self) -> bool {
        self.checksum.is_some()
    }
}

impl fmt::Display for ReleaseAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} ({})", self.package_id, self.version, self.file_name)
    }
}

/// Ordered collection of assets, in backend listing order.
///
/// No sorting is applied; callers that need version order should use
/// [`ReleaseFeed::latest`] or sort a copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFeed {
    #[serde(rename = "Assets")]
    assets: Vec<ReleaseAsset>,
}

impl ReleaseFeed {
    /// Create a feed from assets, preserving their order.
    pub fn new(assets: Vec<ReleaseAsset>) -> Self {
        Self { assets }
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the feed has no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Iterate assets in listing order.
    pub fn iter(&self) -> std::slice::Iter<'_, ReleaseAsset> {
        self.assets.iter()
    }

    /// Assets as a slice.
    pub fn assets(&self) -> &[ReleaseAsset] {
        &self.assets
    }

    /// Find an asset by file name.
    pub fn find(&self, file_name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.file_name == file_name)
    }

    /// The asset with the highest version, if any.
    ///
    /// Ties keep the earliest listed asset.
    pub fn latest(&self) -> Option<&ReleaseAsset> {
        self.assets.iter().fold(None, |best: Option<&ReleaseAsset>, a| match best {
            Some(b) if b.version >= a.version => Some(b),
            _ => Some(a),
        })
    }

    /// Serialize to the feed JSON format.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse the feed JSON format.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Consume the feed, returning its assets.
    pub fn into_assets(self) -> Vec<ReleaseAsset> {
        self.assets
    }
}

impl IntoIterator for ReleaseFeed {
    type Item = ReleaseAsset;
    type IntoIter = std::vec::IntoIter<ReleaseAsset>;

    fn into_iter(self) -> Self::IntoIter {
        self.assets.into_iter()
    }
}

impl<'a> IntoIterator for &'a ReleaseFeed {
    type Item = &'a ReleaseAsset;
    type IntoIter = std::slice::Iter<'a, ReleaseAsset>;

    fn into_iter(self) -> Self::IntoIter {
        self.assets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, version: &str) -> ReleaseAsset {
        ReleaseAsset::new("App", name, Version::parse(version).unwrap(), 100)
    }

    #[test]
    fn test_new_asset_is_full_without_checksum() {
        let a = asset("App-1.0.0.zip", "1.0.0");
        assert_eq!(a.kind, AssetKind::Full);
        assert!(a.checksum.is_none());
        assert!(!a.is_verified());
    }

    #[test]
    fn test_feed_preserves_listing_order() {
        let feed = ReleaseFeed::new(vec![
            asset("App-2.0.0.zip", "2.0.0"),
            asset("App-1.0.0.zip", "1.0.0"),
        ]);
        let names: Vec<_> = feed.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["App-2.0.0.zip", "App-1.0.0.zip"]);
    }

    #[test]
    fn test_feed_latest() {
        let feed = ReleaseFeed::new(vec![
            asset("App-1.0.0.zip", "1.0.0"),
            asset("App-1.10.0.zip", "1.10.0"),
            asset("App-1.2.0.zip", "1.2.0"),
            asset("App-2.0.0.zip", "2.0.0"),
        ]);
        assert_eq!(feed.latest().unwrap().file_name, "App-2.0.0.zip");
        assert!(ReleaseFeed::default().latest().is_none());
    }

    #[test]
    fn test_feed_find() {
        let feed = ReleaseFeed::new(vec![asset("App-1.0.0.zip", "1.0.0")]);
        assert!(feed.find("App-1.0.0.zip").is_some());
        assert!(feed.find("App-9.0.0.zip").is_none());
    }

    #[test]
    fn test_feed_json_shape() {
        let mut a = asset("App-1.2.3.zip", "1.2.3");
        a.checksum = Some("ABCDEF".to_string());
        let feed = ReleaseFeed::new(vec![a]);

        let json = feed.to_json().unwrap();
        assert!(json.contains("\"Assets\""));
        assert!(json.contains("\"PackageId\": \"App\""));
        assert!(json.contains("\"Version\": \"1.2.3\""));
        assert!(json.contains("\"Type\": \"Full\""));
        assert!(json.contains("\"SHA1\": \"ABCDEF\""));
        assert!(json.contains("\"Size\": 100"));

        let parsed = ReleaseFeed::from_json(&json).unwrap();
        assert_eq!(parsed, feed);
    }
}

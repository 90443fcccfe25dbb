//! ReleaseFeed - Update source adapter for file-storage backends
//!
//! This library turns a flat folder of release artifacts (Google Drive,
//! a local directory) into a versioned release feed an installer can pick
//! from, then downloads the chosen artifact with progress, cancellation and
//! a digest attached for verification.
//!
//! # Modules
//!
//! - [`version`] - semantic version extraction from file names
//! - [`checksum`] - streaming file digests
//! - [`identity`] - file name to backend identifier map
//! - [`feed`] - feed resolution from a backend listing
//! - [`download`] - single-artifact downloads
//! - [`source`] - the [`UpdateSource`] facade tying them together
//! - [`backend`] - storage backends
//! - [`config`] / [`logging`] - configuration file and tracing setup

pub mod asset;
pub mod backend;
pub mod checksum;
pub mod config;
pub mod download;
pub mod error;
pub mod feed;
pub mod identity;
pub mod logging;
pub mod progress;
pub mod source;
pub mod state;
pub mod version;

pub use asset::{AssetKind, ReleaseAsset, ReleaseFeed};
pub use backend::{BackendEntry, BackendError, StorageBackend, TransferEvent};
pub use checksum::{compute_digest, ChecksumComputer, DigestAlgorithm};
pub use config::SourceConfig;
pub use download::ArtifactDownloader;
pub use error::{SourceError, SourceResult};
pub use feed::FeedResolver;
pub use identity::{ArtifactId, IdentityMap};
pub use source::{BackendUpdateSource, UpdateSource};
pub use state::DownloadPhase;
pub use version::parse_version;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

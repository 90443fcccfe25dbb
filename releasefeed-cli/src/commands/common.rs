//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use releasefeed::backend::{DriveCredential, GoogleDriveBackend, LocalDirectoryBackend};
use releasefeed::config::{BackendKind, ConfigFile};
use releasefeed::logging::{init_logging, LoggingConfig, WorkerGuard};
use releasefeed::{BackendUpdateSource, StorageBackend};
use tracing::debug;

use crate::error::CliError;

/// Backend selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BackendType {
    /// Google Drive folder (container is the folder id)
    Drive,
    /// Local directory (container is a subdirectory of --root)
    Local,
}

impl From<BackendKind> for BackendType {
    fn from(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Drive => BackendType::Drive,
            BackendKind::Local => BackendType::Local,
        }
    }
}

/// Source selection shared by `feed` and `download`.
///
/// Every flag overrides the matching config file value.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Storage backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendType>,

    /// Container holding the releases (Drive folder id or directory name)
    #[arg(long)]
    pub container: Option<String>,

    /// Package identifier stamped on each release
    #[arg(long)]
    pub package_id: Option<String>,

    /// Google Drive API key
    #[arg(long, env = "RELEASEFEED_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Google Drive OAuth access token
    #[arg(long, env = "RELEASEFEED_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Root directory for the local backend
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Keep identifiers of files that disappear between resolutions
    #[arg(long)]
    pub keep_stale: bool,
}

/// Shared state for a command run: loaded config plus the logging guard.
pub struct CliContext {
    config: ConfigFile,
    _log_guard: Option<WorkerGuard>,
}

impl CliContext {
    /// Load configuration and install logging.
    ///
    /// `log_level` and `log_file` override the `[logging]` section.
    pub fn new(
        config_path: Option<&PathBuf>,
        log_level: Option<String>,
        log_file: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let mut logging = LoggingConfig::default()
            .with_level(log_level.unwrap_or_else(|| config.logging.level.clone()))
            .with_ansi(console::Term::stderr().features().colors_supported());
        if let Some(file) = log_file.or_else(|| config.logging.file.clone()) {
            logging = logging.with_file(file);
        }
        let guard = init_logging(&logging)?;

        debug!(version = releasefeed::VERSION, "releasefeed starting");
        Ok(Self {
            config,
            _log_guard: guard,
        })
    }

    /// Loaded configuration file.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Build the update source from CLI args and config.
    pub fn update_source(&self, args: &SourceArgs) -> Result<BackendUpdateSource, CliError> {
        let backend = build_backend(args, &self.config)?;
        let mut source_config = self
            .config
            .source_config(args.container.clone(), args.package_id.clone())?;
        if args.keep_stale {
            source_config = source_config.with_evict_stale_identities(false);
        }
        Ok(BackendUpdateSource::new(backend, source_config))
    }
}

/// Resolve the storage backend from CLI args and config.
pub fn build_backend(
    args: &SourceArgs,
    config: &ConfigFile,
) -> Result<Arc<dyn StorageBackend>, CliError> {
    // CLI takes precedence, then config
    let backend = args
        .backend
        .unwrap_or_else(|| config.source.backend.into());

    match backend {
        BackendType::Drive => {
            let credential = resolve_credential(
                args.access_token
                    .clone()
                    .or_else(|| config.source.access_token.clone()),
                args.api_key.clone().or_else(|| config.source.api_key.clone()),
            );
            let mut drive = GoogleDriveBackend::new(credential)?;
            if let Some(base_url) = &config.source.base_url {
                drive = drive.with_base_url(base_url.clone());
            }
            Ok(Arc::new(drive))
        }
        BackendType::Local => {
            let root = args
                .root
                .clone()
                .or_else(|| config.source.root.clone())
                .ok_or_else(|| {
                    CliError::Config(
                        "Local backend requires a root directory. \
                         Set root in config.ini or use --root"
                            .to_string(),
                    )
                })?;
            Ok(Arc::new(LocalDirectoryBackend::new(root)))
        }
    }
}

/// Pick a Drive credential; an access token wins over an API key.
pub fn resolve_credential(access_token: Option<String>, api_key: Option<String>) -> DriveCredential {
    match (access_token, api_key) {
        (Some(token), _) => DriveCredential::BearerToken(token),
        (None, Some(key)) => DriveCredential::ApiKey(key),
        (None, None) => DriveCredential::Anonymous,
    }
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_precedence() {
        assert!(matches!(
            resolve_credential(Some("t".into()), Some("k".into())),
            DriveCredential::BearerToken(_)
        ));
        assert!(matches!(
            resolve_credential(None, Some("k".into())),
            DriveCredential::ApiKey(_)
        ));
        assert!(matches!(
            resolve_credential(None, None),
            DriveCredential::Anonymous
        ));
    }

    #[test]
    fn test_local_backend_requires_root() {
        let args = SourceArgs {
            backend: Some(BackendType::Local),
            ..Default::default()
        };
        let err = build_backend(&args, &ConfigFile::default()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_local_backend_from_config() {
        let mut config = ConfigFile::default();
        config.source.backend = BackendKind::Local;
        config.source.root = Some(PathBuf::from("/srv/artifacts"));

        let backend = build_backend(&SourceArgs::default(), &config).unwrap();
        assert_eq!(backend.name(), "local");
    }

    #[test]
    fn test_backend_from_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(
            &path,
            "[source]\nbackend = local\nroot = /srv/artifacts\ncontainer = releases\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        let drive = SourceArgs {
            backend: Some(BackendType::Drive),
            ..Default::default()
        };

        assert_eq!(build_backend(&SourceArgs::default(), &config).unwrap().name(), "local");
        assert_eq!(build_backend(&drive, &config).unwrap().name(), "drive");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}

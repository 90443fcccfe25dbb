//! INI configuration file.
//!
//! ```text
//! [source]
//! backend = drive            ; drive | local
//! container = 1AbCdEf...     ; Drive folder id, or directory under root
//! package_id = MyApp
//! api_key =
//! access_token =
//! root =                     ; local backend root directory
//! base_url =                 ; override the Drive API endpoint
//!
//! [download]
//! directory = ~/Downloads
//! digest = sha1              ; sha1 | sha256
//! evict_stale = true
//!
//! [logging]
//! level = info
//! file =
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

use super::SourceConfig;
use crate::checksum::DigestAlgorithm;

const SOURCE: &str = "source";
const DOWNLOAD: &str = "download";
const LOGGING: &str = "logging";

/// Errors loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The file is not valid INI.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// The file could not be written.
    #[error("failed to write config {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// A value is present but not acceptable.
    #[error("invalid value '{value}' for [{section}] {key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    /// A required value is absent.
    #[error("missing [{section}] {key}")]
    MissingValue { section: String, key: String },
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Google Drive folder.
    #[default]
    Drive,
    /// Local directory.
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drive => write!(f, "drive"),
            Self::Local => write!(f, "local"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drive" | "gdrive" | "google-drive" => Ok(Self::Drive),
            "local" | "dir" | "directory" => Ok(Self::Local),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

/// `[source]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSection {
    pub backend: BackendKind,
    pub container: Option<String>,
    pub package_id: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub root: Option<PathBuf>,
    pub base_url: Option<String>,
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSection {
    pub directory: Option<PathBuf>,
    pub digest: DigestAlgorithm,
    pub evict_stale: bool,
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            directory: None,
            digest: DigestAlgorithm::default(),
            evict_stale: true,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSection {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub source: SourceSection,
    pub download: DownloadSection,
    pub logging: LoggingSection,
}

/// Default location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("releasefeed")
        .join("config.ini")
}

impl ConfigFile {
    /// Load from the default location, or defaults if the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, or defaults if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        Self::parse(&contents)
    }

    /// Parse INI text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let get = |section: &str, key: &str| -> Option<String> {
            ini.section(Some(section))
                .and_then(|props| props.get(key))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut config = Self::default();

        if let Some(value) = get(SOURCE, "backend") {
            config.source.backend = parse_value(SOURCE, "backend", &value)?;
        }
        config.source.container = get(SOURCE, "container");
        config.source.package_id = get(SOURCE, "package_id");
        config.source.api_key = get(SOURCE, "api_key");
        config.source.access_token = get(SOURCE, "access_token");
        config.source.root = get(SOURCE, "root").map(|p| expand_home(&p));
        config.source.base_url = get(SOURCE, "base_url");

        config.download.directory = get(DOWNLOAD, "directory").map(|p| expand_home(&p));
        if let Some(value) = get(DOWNLOAD, "digest") {
            config.download.digest = parse_value(DOWNLOAD, "digest", &value)?;
        }
        if let Some(value) = get(DOWNLOAD, "evict_stale") {
            config.download.evict_stale = parse_bool(DOWNLOAD, "evict_stale", &value)?;
        }

        if let Some(level) = get(LOGGING, "level") {
            config.logging.level = level;
        }
        config.logging.file = get(LOGGING, "file").map(|p| expand_home(&p));

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        let path_str = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };

        ini.with_section(Some(SOURCE))
            .set("backend", self.source.backend.to_string())
            .set("container", self.source.container.clone().unwrap_or_default())
            .set("package_id", self.source.package_id.clone().unwrap_or_default())
            .set("api_key", self.source.api_key.clone().unwrap_or_default())
            .set("access_token", self.source.access_token.clone().unwrap_or_default())
            .set("root", path_str(&self.source.root))
            .set("base_url", self.source.base_url.clone().unwrap_or_default());
        ini.with_section(Some(DOWNLOAD))
            .set("directory", path_str(&self.download.directory))
            .set("digest", self.download.digest.to_string())
            .set("evict_stale", self.download.evict_stale.to_string());
        ini.with_section(Some(LOGGING))
            .set("level", self.logging.level.clone())
            .set("file", path_str(&self.logging.file));

        ini
    }

    /// Save to the default location, creating parent directories.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_file_path();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_failed = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
        self.to_ini().write_to_file(path).map_err(write_failed)
    }

    /// Build a [`SourceConfig`] from the `[source]` and `[download]` sections.
    ///
    /// `container` and `package_id` override the file when given.
    pub fn source_config(
        &self,
        container: Option<String>,
        package_id: Option<String>,
    ) -> Result<SourceConfig, ConfigError> {
        let container = container
            .or_else(|| self.source.container.clone())
            .ok_or_else(|| missing(SOURCE, "container"))?;
        let package_id = package_id
            .or_else(|| self.source.package_id.clone())
            .ok_or_else(|| missing(SOURCE, "package_id"))?;

        Ok(SourceConfig::new(package_id, container)
            .with_digest(self.download.digest)
            .with_evict_stale_identities(self.download.evict_stale))
    }
}

fn missing(section: &str, key: &str) -> ConfigError {
    ConfigError::MissingValue {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn parse_value<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

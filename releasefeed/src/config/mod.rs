//! Configuration for update sources.
//!
//! - [`SourceConfig`]: what one update source needs at construction
//! - [`ConfigFile`]: the user-editable INI file the CLI reads
//!
//! CLI arguments override config file values when specified.

mod file;
mod source;

pub use file::{config_file_path, BackendKind, ConfigError, ConfigFile};
pub use source::SourceConfig;

//! Error types for docpack configuration.

use std::{io, path::PathBuf};

use thiserror::Error;
use toml::{de, ser};

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse config file {path}: {source}")]
    ParseToml {
        /// Path to the file that could not be parsed.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: de::Error,
    },

    /// Failed to render settings as TOML.
    #[error("failed to serialize settings: {source}")]
    SerializeToml {
        /// Underlying TOML serialization error.
        #[from]
        source: ser::Error,
    },

    /// A setting holds a value outside its allowed range.
    #[error("invalid value for {key} in {path}: {reason}")]
    InvalidValue {
        /// Config file declaring the value.
        path: PathBuf,
        /// Dotted key of the setting, e.g. `repack.max_tokens`.
        key: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

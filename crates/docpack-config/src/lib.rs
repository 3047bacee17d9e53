//! Configuration system for docpack.
//!
//! docpack reads TOML files named `.docpack.toml`. Configuration is resolved by walking up the
//! directory tree from the current working directory, collecting every `.docpack.toml` found,
//! then adding `~/.docpack.toml` with the lowest precedence.

#![warn(missing_docs)]

mod discovery;
mod error;
mod merge;
mod parse;
mod templates;

use std::path::{Path, PathBuf};

use docpack_document::{DEFAULT_ENCODING, DEFAULT_MAX_DEPTH};

pub use discovery::{CONFIG_FILENAME, discover_config_files, global_config_path, is_global_config};
pub use error::ConfigError;
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{
    RawConfig, RawRepackSettings, RawResolveSettings, parse_config_file, parse_config_str,
};
use serde::{Deserialize, Serialize};
pub use templates::{global_template, local_template};

/// Fully merged configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Repacking defaults.
    pub repack: RepackSettings,
    /// Content resolution limits.
    pub resolve: ResolveSettings,
    /// Files the configuration was merged from, highest precedence first.
    pub sources: Vec<PathBuf>,
}

impl Config {
    /// Discovers and merges every configuration file that applies to `cwd`.
    ///
    /// Returns `Ok(Config::default())` if no file is found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        Self::load_from_files(&discover_config_files(cwd))
    }

    /// Merges the given files, highest precedence first.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        let parsed = files
            .iter()
            .map(|path| {
                Ok(ParsedConfig {
                    path: path.clone(),
                    config: parse_config_file(path)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(merge_configs(&parsed))
    }

    /// Renders the effective settings in `.docpack.toml` form.
    pub fn settings_to_toml(&self) -> Result<String, ConfigError> {
        let serializable = SerializableSettings {
            repack: &self.repack,
            resolve: &self.resolve,
        };
        Ok(toml::to_string_pretty(&serializable)?)
    }
}

/// Defaults for `docpack repack`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RepackSettings {
    /// Token budget per repacked chunk.
    pub max_tokens: usize,
    /// Tokenizer encoding name.
    pub encoding: String,
    /// Chunk group to repack.
    pub group: String,
}

impl Default for RepackSettings {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            encoding: String::from(DEFAULT_ENCODING),
            group: String::from("pages"),
        }
    }
}

/// Limits applied while resolving document content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolveSettings {
    /// Maximum nesting of parent ranges and chunk groups.
    pub max_depth: usize,
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Borrowed view of the settings sections for TOML output.
#[derive(Serialize)]
struct SerializableSettings<'a> {
    /// Repacking defaults.
    repack: &'a RepackSettings,
    /// Resolution limits.
    resolve: &'a ResolveSettings,
}

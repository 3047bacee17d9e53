//! Configuration file parsing.
//!
//! Individual `.docpack.toml` files parse into `RawConfig`, where every field is optional so
//! that partial files can be merged.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::ConfigError;

/// Configuration as written in one TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    /// When true, discovery stops at this file.
    pub root: Option<bool>,
    /// `[repack]` section.
    pub repack: Option<RawRepackSettings>,
    /// `[resolve]` section.
    pub resolve: Option<RawResolveSettings>,
}

/// Raw `[repack]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawRepackSettings {
    /// Token budget per repacked chunk.
    pub max_tokens: Option<usize>,
    /// Tokenizer encoding name.
    pub encoding: Option<String>,
    /// Chunk group to repack.
    pub group: Option<String>,
}

/// Raw `[resolve]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawResolveSettings {
    /// Maximum nesting while resolving content.
    pub max_depth: Option<usize>,
}

/// Parses a configuration file from disk.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string, using `path` for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    let config: RawConfig = toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    validate(&config, path)?;
    Ok(config)
}

/// Rejects values no command could use.
fn validate(config: &RawConfig, path: &Path) -> Result<(), ConfigError> {
    let invalid = |key: &'static str, reason: &'static str| ConfigError::InvalidValue {
        path: path.to_path_buf(),
        key,
        reason,
    };
    if let Some(repack) = &config.repack {
        if repack.max_tokens == Some(0) {
            return Err(invalid("repack.max_tokens", "must be positive"));
        }
        if repack.encoding.as_deref() == Some("") {
            return Err(invalid("repack.encoding", "must not be empty"));
        }
        if repack.group.as_deref() == Some("") {
            return Err(invalid("repack.group", "must not be empty"));
        }
    }
    if let Some(resolve) = &config.resolve
        && resolve.max_depth == Some(0)
    {
        return Err(invalid("resolve.max_depth", "must be positive"));
    }
    Ok(())
}

/// Checks whether a config file sets `root = true`.
///
/// Unreadable or unparsable files count as non-root; loading reports them later.
pub fn is_root_config(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    toml::from_str::<RawConfig>(&contents).is_ok_and(|config| config.root == Some(true))
}

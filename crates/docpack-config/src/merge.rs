//! Configuration merging.

use std::path::PathBuf;

use crate::{
    Config, RawConfig, RepackSettings, ResolveSettings,
    parse::{RawRepackSettings, RawResolveSettings},
};

/// A parsed config file with its source path.
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

/// Merges parsed files into one `Config`.
///
/// Files are given highest precedence first. For every setting the first file that defines it
/// wins; anything no file defines keeps its default.
pub fn merge_configs(configs: &[ParsedConfig]) -> Config {
    let mut config = Config::default();

    // Apply lowest precedence first so closer files overwrite.
    for parsed in configs.iter().rev() {
        if let Some(repack) = &parsed.config.repack {
            apply_repack(&mut config.repack, repack);
        }
        if let Some(resolve) = &parsed.config.resolve {
            apply_resolve(&mut config.resolve, resolve);
        }
    }

    config.sources = configs.iter().map(|parsed| parsed.path.clone()).collect();
    config
}

/// Overwrites repack settings with the values present in `raw`.
fn apply_repack(result: &mut RepackSettings, raw: &RawRepackSettings) {
    if let Some(v) = raw.max_tokens {
        result.max_tokens = v;
    }
    if let Some(v) = &raw.encoding {
        result.encoding.clone_from(v);
    }
    if let Some(v) = &raw.group {
        result.group.clone_from(v);
    }
}

/// Overwrites resolve settings with the values present in `raw`.
fn apply_resolve(result: &mut ResolveSettings, raw: &RawResolveSettings) {
    if let Some(v) = raw.max_depth {
        result.max_depth = v;
    }
}

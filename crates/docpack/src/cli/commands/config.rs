//! Implementation of `docpack config`.

use std::process::ExitCode;

use super::shared::failure;
use crate::cli::context::CommandContext;

/// Shows the effective configuration and where it came from.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config = &ctx.config;
    let settings = match config.settings_to_toml() {
        Ok(settings) => settings,
        Err(e) => return failure(e),
    };
    if config.sources.is_empty() {
        println!("# no configuration files found, showing defaults");
    } else {
        for source in &config.sources {
            println!("# {}", source.display());
        }
    }
    print!("{settings}");
    ExitCode::SUCCESS
}

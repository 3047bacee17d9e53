//! Command implementations and dispatch.

pub mod chunks;
pub mod config;
pub mod init;
pub mod repack;
pub mod resolve;
mod shared;
pub mod tokens;

use std::process::ExitCode;

use super::{args::Commands, context::CommandContext};

/// Dispatches to the selected subcommand.
pub fn run(command: Commands, ctx: &CommandContext) -> ExitCode {
    match command {
        Commands::Resolve(cmd) => resolve::run(ctx, &cmd),
        Commands::Tokens(cmd) => tokens::run(ctx, &cmd),
        Commands::Chunks(cmd) => chunks::run(ctx, &cmd),
        Commands::Repack(cmd) => repack::run(ctx, &cmd),
        Commands::Init(cmd) => init::run(ctx, &cmd),
        Commands::Config => config::run(ctx),
    }
}

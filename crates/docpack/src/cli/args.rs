//! Clap argument definitions for the `docpack` CLI.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "docpack", version)]
#[command(about = "Resolve and repack chunked JSON documents")]
pub struct Cli {
    /// Log verbosity (-v for debug, -vv for trace); DOCPACK_LOG overrides
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Supported `docpack` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Print the resolved text of a document or one of its chunks
    Resolve(ResolveCommand),

    /// Count the tokens in a document or one of its chunks
    Tokens(TokensCommand),

    /// List chunk groups, or the chunks of one group
    Chunks(ChunksCommand),

    /// Repack a chunk group into chunks bounded by a token budget
    Repack(RepackCommand),

    /// Create a .docpack.toml configuration file
    Init(InitCommand),

    /// Show the effective configuration
    Config,
}

/// Selects a document or one chunk of it.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Document JSON file
    pub file: PathBuf,

    /// Chunk group to select a chunk from
    #[arg(short = 'g', long, requires = "index")]
    pub group: Option<String>,

    /// Position of the chunk within the group
    #[arg(short = 'i', long, requires = "group")]
    pub index: Option<usize>,
}

/// Arguments for `docpack resolve`.
#[derive(Args, Debug, Clone)]
pub struct ResolveCommand {
    /// Document or chunk to resolve.
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for `docpack tokens`.
#[derive(Args, Debug, Clone)]
pub struct TokensCommand {
    /// Document or chunk to measure.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Tokenizer encoding [default: from config, cl100k_base]
    #[arg(short = 'e', long)]
    pub encoding: Option<String>,
}

/// Arguments for `docpack chunks`.
#[derive(Args, Debug, Clone)]
pub struct ChunksCommand {
    /// Document JSON file
    pub file: PathBuf,

    /// Group to list; lists all groups when omitted
    pub group: Option<String>,

    /// Tokenizer encoding [default: from config, cl100k_base]
    #[arg(short = 'e', long)]
    pub encoding: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `docpack repack`.
#[derive(Args, Debug, Clone)]
pub struct RepackCommand {
    /// Document JSON file
    pub file: PathBuf,

    /// Token budget per chunk [default: from config, 2000]
    #[arg(short = 'n', long)]
    pub max_tokens: Option<usize>,

    /// Source chunk group [default: from config, pages]
    #[arg(short = 'g', long)]
    pub group: Option<String>,

    /// Tokenizer encoding [default: from config, cl100k_base]
    #[arg(short = 'e', long)]
    pub encoding: Option<String>,

    /// Target group [default: "<group>:merged(<max-tokens>,<encoding>)"]
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Write the result to this file instead of stdout
    #[arg(short = 'o', long, conflicts_with = "in_place")]
    pub output: Option<PathBuf>,

    /// Overwrite the input file with the result
    #[arg(long)]
    pub in_place: bool,

    /// Output only the new chunks instead of the whole document
    #[arg(long, conflicts_with = "in_place")]
    pub chunks_only: bool,
}

/// Arguments for `docpack init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Create global ~/.docpack.toml instead
    #[arg(long)]
    pub global: bool,

    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_group_requires_index() {
        let result = Cli::try_parse_from(["docpack", "resolve", "doc.json", "--group", "pages"]);
        assert!(result.is_err());

        let cli =
            Cli::try_parse_from(["docpack", "resolve", "doc.json", "-g", "pages", "-i", "2"])
                .unwrap();
        let Commands::Resolve(cmd) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(cmd.target.group.as_deref(), Some("pages"));
        assert_eq!(cmd.target.index, Some(2));
    }

    #[test]
    fn test_repack_output_conflicts_with_in_place() {
        let result = Cli::try_parse_from([
            "docpack",
            "repack",
            "doc.json",
            "--in-place",
            "-o",
            "out.json",
        ]);
        assert!(result.is_err());
    }
}

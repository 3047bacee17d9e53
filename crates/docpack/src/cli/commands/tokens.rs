//! Implementation of `docpack tokens`.

use std::process::ExitCode;

use docpack_document::TiktokenOracle;

use super::shared::{failure, load_document, or_config, select_target};
use crate::cli::{args::TokensCommand, context::CommandContext};

/// Prints the token count of a document or chunk.
pub fn run(ctx: &CommandContext, cmd: &TokensCommand) -> ExitCode {
    let encoding = or_config(cmd.encoding.as_deref(), &ctx.config.repack.encoding);

    let mut doc = match load_document(ctx, &cmd.target.file) {
        Ok(doc) => doc,
        Err(code) => return code,
    };
    let node = match select_target(&mut doc, &cmd.target) {
        Ok(node) => node,
        Err(code) => return code,
    };

    let oracle = TiktokenOracle::new();
    match doc.tree.token_count(node, &oracle, encoding) {
        Ok(count) => {
            println!("{count}");
            ExitCode::SUCCESS
        }
        Err(e) => failure(e),
    }
}

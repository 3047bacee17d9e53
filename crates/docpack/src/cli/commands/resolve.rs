//! Implementation of `docpack resolve`.

use std::process::ExitCode;

use super::shared::{failure, load_document, select_target};
use crate::cli::{args::ResolveCommand, context::CommandContext};

/// Prints the resolved text of a document or chunk.
pub fn run(ctx: &CommandContext, cmd: &ResolveCommand) -> ExitCode {
    let mut doc = match load_document(ctx, &cmd.target.file) {
        Ok(doc) => doc,
        Err(code) => return code,
    };
    let node = match select_target(&mut doc, &cmd.target) {
        Ok(node) => node,
        Err(code) => return code,
    };

    match doc.tree.resolve_content(node) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => failure(e),
    }
}

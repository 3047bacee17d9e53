//! Helpers shared by the document commands.

use std::{fmt::Display, fs, path::Path, process::ExitCode};

use docpack_document::{DocumentTree, NodeId};
use serde_json::Value;

use crate::cli::{args::TargetArgs, context::CommandContext};

/// A document file wrapped into a tree.
pub struct LoadedDocument {
    /// Arena holding the document.
    pub tree: DocumentTree,
    /// The document's root node.
    pub root: NodeId,
}

/// Prints an error and returns a failing exit code.
pub fn failure(e: impl Display) -> ExitCode {
    eprintln!("error: {e}");
    ExitCode::FAILURE
}

/// Reads and wraps a document JSON file.
pub fn load_document(ctx: &CommandContext, path: &Path) -> Result<LoadedDocument, ExitCode> {
    let contents = fs::read_to_string(path)
        .map_err(|e| failure(format!("failed to read {}: {e}", path.display())))?;
    let value: Value = serde_json::from_str(&contents)
        .map_err(|e| failure(format!("failed to parse {}: {e}", path.display())))?;

    let mut tree = DocumentTree::with_max_depth(ctx.config.resolve.max_depth);
    let root = tree
        .wrap(value, None)
        .map_err(|e| failure(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), "loaded document");
    Ok(LoadedDocument { tree, root })
}

/// Returns the node selected by `--group`/`--index`, or the root when neither is given.
pub fn select_target(doc: &mut LoadedDocument, target: &TargetArgs) -> Result<NodeId, ExitCode> {
    let (Some(group), Some(index)) = (&target.group, target.index) else {
        return Ok(doc.root);
    };

    let chunks = doc
        .tree
        .wrapped_chunks(doc.root, group)
        .map_err(failure)?;
    chunks.get(index).copied().ok_or_else(|| {
        failure(format!(
            "group '{group}' has {} chunks, no chunk at index {index}",
            chunks.len()
        ))
    })
}

/// Picks the command-line value if given, else the configured one.
pub fn or_config<'a>(value: Option<&'a str>, configured: &'a str) -> &'a str {
    value.unwrap_or(configured)
}

/// Serializes `value` as pretty JSON.
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ExitCode> {
    serde_json::to_string_pretty(value)
        .map_err(|e| failure(format!("failed to serialize output: {e}")))
}

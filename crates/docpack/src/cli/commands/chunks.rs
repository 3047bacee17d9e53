//! Implementation of `docpack chunks`.

use std::process::ExitCode;

use comfy_table::{Cell, CellAlignment, Table, presets::UTF8_FULL_CONDENSED};
use docpack_document::{TiktokenOracle, Tokenizer};
use serde::Serialize;

use super::shared::{LoadedDocument, failure, load_document, or_config, to_json};
use crate::cli::{args::ChunksCommand, context::CommandContext};

/// One listed chunk.
#[derive(Serialize)]
struct ChunkRow {
    /// Position within the group.
    index: usize,
    /// Chunk identifier.
    id: String,
    /// Byte length of the resolved text.
    bytes: usize,
    /// Token count of the resolved text.
    tokens: usize,
}

/// One listed group.
#[derive(Serialize)]
struct GroupRow {
    /// Group name.
    name: String,
    /// Number of chunks in the group.
    chunks: usize,
}

/// Lists the groups of a document, or the chunks of one group.
pub fn run(ctx: &CommandContext, cmd: &ChunksCommand) -> ExitCode {
    let mut doc = match load_document(ctx, &cmd.file) {
        Ok(doc) => doc,
        Err(code) => return code,
    };

    match &cmd.group {
        Some(group) => {
            let encoding = or_config(cmd.encoding.as_deref(), &ctx.config.repack.encoding);
            list_chunks(&mut doc, group, encoding, cmd.json)
        }
        None => list_groups(&doc, cmd.json),
    }
}

/// Prints every group with its size.
fn list_groups(doc: &LoadedDocument, json: bool) -> ExitCode {
    let record = match doc.tree.record(doc.root) {
        Ok(record) => record,
        Err(e) => return failure(e),
    };
    let rows: Vec<GroupRow> = record
        .chunks
        .iter()
        .map(|(name, chunks)| GroupRow {
            name: name.clone(),
            chunks: chunks.len(),
        })
        .collect();

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("no chunk groups");
        return ExitCode::SUCCESS;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["group", "chunks"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(row.chunks).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
    ExitCode::SUCCESS
}

/// Prints the chunks of `group` with their sizes.
fn list_chunks(doc: &mut LoadedDocument, group: &str, encoding: &str, json: bool) -> ExitCode {
    let nodes = match doc.tree.wrapped_chunks(doc.root, group) {
        Ok(nodes) => nodes,
        Err(e) => return failure(e),
    };

    let oracle = TiktokenOracle::new();
    let mut rows = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.into_iter().enumerate() {
        let row = doc.tree.resolve_content(node).and_then(|text| {
            Ok(ChunkRow {
                index,
                id: doc.tree.id(node)?.to_string(),
                bytes: text.len(),
                tokens: oracle.count(&text, encoding)?,
            })
        });
        match row {
            Ok(row) => rows.push(row),
            Err(e) => return failure(e),
        }
    }

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("group '{group}' has no chunks");
        return ExitCode::SUCCESS;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["#", "id", "bytes", "tokens"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(row.index).set_alignment(CellAlignment::Right),
            Cell::new(&row.id),
            Cell::new(row.bytes).set_alignment(CellAlignment::Right),
            Cell::new(row.tokens).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");

    let total: usize = rows.iter().map(|r| r.tokens).sum();
    println!("{} chunks, {total} tokens ({encoding})", rows.len());
    ExitCode::SUCCESS
}

/// Prints rows as pretty JSON.
fn print_json<T: Serialize>(rows: &[T]) -> ExitCode {
    match to_json(rows) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(code) => code,
    }
}

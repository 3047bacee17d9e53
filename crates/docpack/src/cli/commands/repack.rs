//! Implementation of `docpack repack`.

use std::{fs, path::Path, process::ExitCode};

use docpack_document::{RepackReport, TiktokenOracle};

use super::shared::{failure, load_document, or_config, to_json};
use crate::cli::{args::RepackCommand, context::CommandContext};

/// Repacks a chunk group and writes the updated document.
pub fn run(ctx: &CommandContext, cmd: &RepackCommand) -> ExitCode {
    let settings = &ctx.config.repack;
    let max_tokens = cmd.max_tokens.unwrap_or(settings.max_tokens);
    let group = or_config(cmd.group.as_deref(), &settings.group);
    let encoding = or_config(cmd.encoding.as_deref(), &settings.encoding);

    let mut doc = match load_document(ctx, &cmd.file) {
        Ok(doc) => doc,
        Err(code) => return code,
    };

    let oracle = TiktokenOracle::new();
    let (records, report) = match doc.tree.repack_with_report(
        doc.root,
        &oracle,
        max_tokens,
        group,
        encoding,
        cmd.target.as_deref(),
    ) {
        Ok(result) => result,
        Err(e) => return failure(e),
    };

    let output = if cmd.chunks_only {
        to_json(&records)
    } else {
        match doc.tree.record(doc.root) {
            Ok(record) => to_json(record),
            Err(e) => return failure(e),
        }
    };
    let output = match output {
        Ok(json) => json,
        Err(code) => return code,
    };

    let destination = if cmd.in_place {
        Some(cmd.file.as_path())
    } else {
        cmd.output.as_deref()
    };
    match destination {
        Some(path) => {
            if let Err(code) = write_output(path, &output) {
                return code;
            }
            println!("{}", summary(&report, max_tokens));
            println!("Wrote {}", path.display());
        }
        None => {
            println!("{output}");
            eprintln!("{}", summary(&report, max_tokens));
        }
    }
    ExitCode::SUCCESS
}

/// Writes `contents` to `path` with a trailing newline.
fn write_output(path: &Path, contents: &str) -> Result<(), ExitCode> {
    fs::write(path, format!("{contents}\n")).map_err(|e| {
        eprintln!("error: failed to write {}: {e}", path.display());
        ExitCode::FAILURE
    })
}

/// One-line description of a finished repack.
fn summary(report: &RepackReport, max_tokens: usize) -> String {
    let mut line = format!(
        "repacked {} chunks into {} chunks of at most {max_tokens} tokens in '{}'",
        report.source_chunks, report.emitted_chunks, report.target_group
    );
    if report.split_chunks > 0 {
        line.push_str(&format!(" ({} split)", report.split_chunks));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let mut report = RepackReport {
            target_group: "pages:merged(10,cl100k_base)".into(),
            source_chunks: 4,
            emitted_chunks: 2,
            split_chunks: 0,
        };
        assert_eq!(
            summary(&report, 10),
            "repacked 4 chunks into 2 chunks of at most 10 tokens in 'pages:merged(10,cl100k_base)'"
        );

        report.split_chunks = 1;
        assert!(summary(&report, 10).ends_with("(1 split)"));
    }
}

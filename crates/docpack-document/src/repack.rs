//! Token-bounded repacking of chunk groups.
//!
//! Repacking reads one chunk group and produces a new group whose chunks each hold at most
//! `max_tokens` tokens. It makes a single greedy pass in stored order: consecutive chunks are
//! merged while they fit, and a chunk that is too large on its own is cut into consecutive
//! token slices.
//!
//! Slices are cut at token boundaries, not word or sentence boundaries. A slice that ends inside
//! a multi-byte character hands the incomplete bytes on to the next slice, so the emitted text
//! stays valid and concatenates back to the source. The moved bytes mean a decoded slice may
//! re-encode to a different token count than it was cut at. Oracles without byte-level decoding
//! fall back to their text decode, which may be lossy at such boundaries.

use std::str::from_utf8;

use crate::{DocumentError, DocumentTree, NodeId, RawRecord, Tokenizer};

/// Returns the group name used when a repack is not given an explicit target.
pub fn default_target_group(source_group: &str, max_tokens: usize, encoding: &str) -> String {
    format!("{source_group}:merged({max_tokens},{encoding})")
}

/// Summary of a finished repack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepackReport {
    /// Group the chunks were written to.
    pub target_group: String,
    /// Number of chunks read from the source group.
    pub source_chunks: usize,
    /// Number of chunks emitted.
    pub emitted_chunks: usize,
    /// Number of source chunks that had to be cut into token slices.
    pub split_chunks: usize,
}

/// Builds the output group for one repack.
struct Packer<'a> {
    /// Identifier of the node being repacked.
    node_id: &'a str,
    /// Name of the output group.
    target_group: &'a str,
    /// Token budget per emitted chunk.
    max_tokens: usize,
    /// Texts waiting to be merged.
    pending: Vec<String>,
    /// Token count of `pending`.
    pending_tokens: usize,
    /// Chunks emitted so far.
    emitted: Vec<RawRecord>,
}

impl<'a> Packer<'a> {
    /// Starts an empty packer.
    fn new(node_id: &'a str, target_group: &'a str, max_tokens: usize) -> Self {
        Self {
            node_id,
            target_group,
            max_tokens,
            pending: Vec::new(),
            pending_tokens: 0,
            emitted: Vec::new(),
        }
    }

    /// Emits one output chunk.
    fn emit(&mut self, content: String) {
        let index = self.emitted.len();
        self.emitted.push(RawRecord {
            id: format!("{}/{}@{index}", self.node_id, self.target_group),
            parent: Some(self.node_id.to_string()),
            content: Some(content),
            ..RawRecord::default()
        });
    }

    /// Emits the pending texts as one chunk, if there is anything to emit.
    fn flush(&mut self) {
        let content = self.pending.concat();
        self.pending.clear();
        self.pending_tokens = 0;
        if !content.is_empty() {
            self.emit(content);
        }
    }

    /// Emits the complete characters of `bytes` and keeps an incomplete tail for the next slice.
    fn emit_slice(&mut self, bytes: &mut Vec<u8>) {
        let complete = match from_utf8(bytes) {
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            _ => bytes.len(),
        };
        let tail = bytes.split_off(complete);
        let text = String::from_utf8_lossy(bytes).into_owned();
        *bytes = tail;
        if !text.is_empty() {
            self.emit(text);
        }
    }

    /// Adds a chunk that fits the budget on its own.
    fn push(&mut self, text: String, tokens: usize) {
        if self.pending_tokens + tokens > self.max_tokens {
            self.flush();
        }
        self.pending.push(text);
        self.pending_tokens += tokens;
    }
}

#[allow(clippy::multiple_inherent_impl)]
impl DocumentTree {
    /// Returns the number of tokens in the resolved content of `id`.
    pub fn token_count<T: Tokenizer + ?Sized>(
        &self,
        id: NodeId,
        tokenizer: &T,
        encoding: &str,
    ) -> Result<usize, DocumentError> {
        let text = self.resolve_content(id)?;
        Ok(tokenizer.count(&text, encoding)?)
    }

    /// Repacks `source_group` of `id` into chunks of at most `max_tokens` tokens.
    ///
    /// The result is stored under `target_group` (by default
    /// `"{source_group}:merged({max_tokens},{encoding})"`) and returned. The source group is left
    /// untouched, and no nodes are added to the arena. Concatenating the emitted chunks
    /// reproduces the concatenated source text, unless the tokenizer's decode is lossy.
    pub fn repack<T: Tokenizer + ?Sized>(
        &mut self,
        id: NodeId,
        tokenizer: &T,
        max_tokens: usize,
        source_group: &str,
        encoding: &str,
        target_group: Option<&str>,
    ) -> Result<Vec<RawRecord>, DocumentError> {
        let (records, _) = self.repack_with_report(
            id,
            tokenizer,
            max_tokens,
            source_group,
            encoding,
            target_group,
        )?;
        Ok(records)
    }

    /// Like [`Self::repack`], also returning a summary of what was done.
    pub fn repack_with_report<T: Tokenizer + ?Sized>(
        &mut self,
        id: NodeId,
        tokenizer: &T,
        max_tokens: usize,
        source_group: &str,
        encoding: &str,
        target_group: Option<&str>,
    ) -> Result<(Vec<RawRecord>, RepackReport), DocumentError> {
        if max_tokens == 0 {
            return Err(DocumentError::InvalidArgument {
                message: "max_tokens must be positive".to_string(),
            });
        }
        let target_group = target_group.map_or_else(
            || default_target_group(source_group, max_tokens, encoding),
            str::to_string,
        );

        let source_chunks = self.chunks(id, source_group)?.len();
        let node_id = self.id(id)?.to_string();
        let mut packer = Packer::new(&node_id, &target_group, max_tokens);
        let mut split_chunks = 0;

        for index in 0..source_chunks {
            let text = self.resolve_chunk(id, source_group, index)?;
            let tokens = tokenizer.encode(&text, encoding)?;

            if tokens.len() > max_tokens {
                packer.flush();
                split_chunks += 1;
                let mut bytes = Vec::new();
                for slice in tokens.chunks(max_tokens) {
                    bytes.extend(tokenizer.decode_bytes(slice, encoding)?);
                    packer.emit_slice(&mut bytes);
                }
                if !bytes.is_empty() {
                    packer.emit(String::from_utf8_lossy(&bytes).into_owned());
                }
            } else {
                packer.push(text, tokens.len());
            }
        }
        packer.flush();

        let records = packer.emitted;
        let report = RepackReport {
            target_group,
            source_chunks,
            emitted_chunks: records.len(),
            split_chunks,
        };
        tracing::debug!(
            node = %node_id,
            source = source_group,
            target = %report.target_group,
            max_tokens,
            source_chunks = report.source_chunks,
            emitted_chunks = report.emitted_chunks,
            split_chunks = report.split_chunks,
            "repacked chunk group"
        );

        self.set_chunks(id, &report.target_group, records.clone())?;
        Ok((records, report))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::{Value, json};

    use super::*;
    use crate::{TiktokenOracle, TokenId, TokenizerError};

    /// One token per whitespace-separated word; a word's token carries its trailing spaces.
    ///
    /// Encoding keeps a vocabulary of the exact pieces it has seen so decoding is exact.
    #[derive(Default)]
    struct WordTokenizer {
        /// Pieces indexed by token id.
        vocab: RefCell<Vec<String>>,
    }

    impl Tokenizer for WordTokenizer {
        fn encode(&self, text: &str, encoding: &str) -> Result<Vec<TokenId>, TokenizerError> {
            if encoding != "words" {
                return Err(TokenizerError::UnknownEncoding {
                    encoding: encoding.to_string(),
                });
            }
            let mut vocab = self.vocab.borrow_mut();
            Ok(text
                .split_inclusive(' ')
                .map(|piece| {
                    vocab.push(piece.to_string());
                    (vocab.len() - 1) as TokenId
                })
                .collect())
        }

        fn decode(&self, tokens: &[TokenId], _encoding: &str) -> Result<String, TokenizerError> {
            let vocab = self.vocab.borrow();
            Ok(tokens.iter().map(|t| vocab[*t as usize].as_str()).collect())
        }
    }

    /// Byte-level oracle whose decode is lossy for sequences that split a character.
    struct ByteTokenizer;

    impl Tokenizer for ByteTokenizer {
        fn encode(&self, text: &str, _encoding: &str) -> Result<Vec<TokenId>, TokenizerError> {
            Ok(text.bytes().map(TokenId::from).collect())
        }

        fn decode(&self, tokens: &[TokenId], _encoding: &str) -> Result<String, TokenizerError> {
            let bytes: Vec<u8> = tokens.iter().map(|t| *t as u8).collect();
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }

    /// Byte-level oracle that only decodes complete characters to text, but any slice to bytes.
    struct Utf8Bytes;

    impl Tokenizer for Utf8Bytes {
        fn encode(&self, text: &str, _encoding: &str) -> Result<Vec<TokenId>, TokenizerError> {
            Ok(text.bytes().map(TokenId::from).collect())
        }

        fn decode(&self, tokens: &[TokenId], encoding: &str) -> Result<String, TokenizerError> {
            String::from_utf8(self.decode_bytes(tokens, encoding)?).map_err(|e| {
                TokenizerError::Decode {
                    encoding: encoding.to_string(),
                    count: tokens.len(),
                    message: e.to_string(),
                }
            })
        }

        fn decode_bytes(
            &self,
            tokens: &[TokenId],
            _encoding: &str,
        ) -> Result<Vec<u8>, TokenizerError> {
            Ok(tokens.iter().map(|t| *t as u8).collect())
        }
    }

    /// Oracle whose decode always fails.
    struct BrokenDecoder;

    impl Tokenizer for BrokenDecoder {
        fn encode(&self, text: &str, _encoding: &str) -> Result<Vec<TokenId>, TokenizerError> {
            Ok(text.bytes().map(TokenId::from).collect())
        }

        fn decode(&self, tokens: &[TokenId], encoding: &str) -> Result<String, TokenizerError> {
            Err(TokenizerError::Decode {
                encoding: encoding.to_string(),
                count: tokens.len(),
                message: "unsupported".to_string(),
            })
        }
    }

    /// Builds a document whose `pages` group holds the given texts.
    fn document(pages: &[&str]) -> (DocumentTree, NodeId) {
        let pages: Vec<Value> = pages
            .iter()
            .enumerate()
            .map(|(i, text)| json!({"id": format!("p{i}"), "content": text}))
            .collect();
        let mut tree = DocumentTree::new();
        let root = tree
            .wrap(json!({"id": "doc", "chunks": {"pages": pages}}), None)
            .unwrap();
        (tree, root)
    }

    /// Builds a text of `n` one-token words.
    fn words(n: usize, word: &str) -> String {
        (0..n).map(|_| format!("{word} ")).collect()
    }

    /// Concatenates the content of emitted records.
    fn joined(records: &[RawRecord]) -> String {
        records
            .iter()
            .map(|r| r.content.as_deref().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_default_target_group_name() {
        assert_eq!(
            default_target_group("pages", 500, "cl100k_base"),
            "pages:merged(500,cl100k_base)"
        );
    }

    #[test]
    fn test_small_group_merges_into_one_chunk() {
        let text = "The quick brown fox jumps over the lazy dog.";
        let (mut tree, root) = document(&[text]);
        let oracle = TiktokenOracle::new();

        let merged = tree
            .repack(root, &oracle, 500, "pages", "cl100k_base", None)
            .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content.as_deref(), Some(text));
        assert_eq!(merged[0].id, "doc/pages:merged(500,cl100k_base)@0");
        assert_eq!(merged[0].parent.as_deref(), Some("doc"));
        assert_eq!(
            tree.chunks(root, "pages:merged(500,cl100k_base)").unwrap(),
            merged.as_slice()
        );
    }

    #[test]
    fn test_two_chunks_that_do_not_fit_together() {
        let a = words(10, "alpha");
        let b = words(10, "beta");
        let (mut tree, root) = document(&[&a, &b]);

        let merged = tree
            .repack(root, &WordTokenizer::default(), 15, "pages", "words", None)
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].content.as_deref(), Some(a.as_str()));
        assert_eq!(merged[1].content.as_deref(), Some(b.as_str()));
    }

    #[test]
    fn test_chunks_merge_up_to_budget() {
        let (mut tree, root) = document(&["a b ", "c ", "d e f ", "g "]);

        let merged = tree
            .repack(root, &WordTokenizer::default(), 3, "pages", "words", Some("packed"))
            .unwrap();

        let contents: Vec<_> = merged.iter().filter_map(|r| r.content.as_deref()).collect();
        assert_eq!(contents, vec!["a b c ", "d e f ", "g "]);
        let ids: Vec<_> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["doc/packed@0", "doc/packed@1", "doc/packed@2"]);
    }

    #[test]
    fn test_oversized_chunk_is_split() {
        let big = words(5000, "w");
        let (mut tree, root) = document(&[&big]);
        let tokenizer = WordTokenizer::default();

        let merged = tree
            .repack(root, &tokenizer, 2000, "pages", "words", None)
            .unwrap();

        let counts: Vec<_> = merged
            .iter()
            .map(|r| tokenizer.count(r.content.as_deref().unwrap(), "words").unwrap())
            .collect();
        assert_eq!(counts, vec![2000, 2000, 1000]);
        assert_eq!(joined(&merged), big);
    }

    #[test]
    fn test_split_flushes_pending_and_shares_index() {
        let (mut tree, root) = document(&["a ", "b c d e ", "f "]);

        let (merged, report) = tree
            .repack_with_report(root, &WordTokenizer::default(), 3, "pages", "words", Some("t"))
            .unwrap();

        let contents: Vec<_> = merged.iter().filter_map(|r| r.content.as_deref()).collect();
        assert_eq!(contents, vec!["a ", "b c d ", "e ", "f "]);
        let ids: Vec<_> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["doc/t@0", "doc/t@1", "doc/t@2", "doc/t@3"]);
        assert_eq!(
            report,
            RepackReport {
                target_group: "t".into(),
                source_chunks: 3,
                emitted_chunks: 4,
                split_chunks: 1,
            }
        );
    }

    #[test]
    fn test_merged_chunks_bounded_with_tiktoken() {
        // Pages end in a newline so the merged text tokenizes exactly as its parts.
        let pages = [
            "Chapter one.\n",
            "It was a bright cold day in April.\n",
            "",
            "Short.\n",
            "The clocks were striking thirteen.\n",
            "Tail.\n",
        ];
        let (mut tree, root) = document(&pages);
        let oracle = TiktokenOracle::new();

        let merged = tree
            .repack(root, &oracle, 12, "pages", "cl100k_base", None)
            .unwrap();

        assert!(merged.len() > 1);
        assert_eq!(joined(&merged), pages.concat());
        for record in &merged {
            let count = oracle
                .count(record.content.as_deref().unwrap(), "cl100k_base")
                .unwrap();
            assert!(count <= 12, "{count} tokens in {:?}", record.content);
        }
    }

    #[test]
    fn test_split_ascii_text_with_tiktoken() {
        let page = "A considerably longer page that goes on and on about nothing in particular, \
                    repeating itself a little, so that it is larger than the budget on its own.";
        let (mut tree, root) = document(&["Intro. ", page]);
        let oracle = TiktokenOracle::new();
        let page_tokens = oracle.count(page, "cl100k_base").unwrap();

        let (merged, report) = tree
            .repack_with_report(root, &oracle, 8, "pages", "cl100k_base", None)
            .unwrap();

        assert_eq!(report.split_chunks, 1);
        assert_eq!(merged.len(), 1 + page_tokens.div_ceil(8));
        assert_eq!(merged[0].content.as_deref(), Some("Intro. "));
        // ASCII slices decode back to their exact source bytes.
        assert_eq!(joined(&merged), format!("Intro. {page}"));
    }

    #[test]
    fn test_lossy_decode_at_split_boundary() {
        // "é" is two bytes; a two-token budget cuts it in half.
        let (mut tree, root) = document(&["aé"]);

        let merged = tree
            .repack(root, &ByteTokenizer, 2, "pages", "bytes", None)
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].content.as_deref(), Some("a\u{fffd}"));
        assert_ne!(joined(&merged), "aé");
        // Re-encoding the decoded slice no longer matches the cut size.
        let reencoded = ByteTokenizer
            .count(merged[0].content.as_deref().unwrap(), "bytes")
            .unwrap();
        assert!(reencoded > 2);
    }

    #[test]
    fn test_split_hands_partial_characters_to_next_slice() {
        let (mut tree, root) = document(&["aé", "é€"]);

        let merged = tree
            .repack(root, &Utf8Bytes, 1, "pages", "bytes", Some("t"))
            .unwrap();

        let contents: Vec<_> = merged.iter().filter_map(|r| r.content.as_deref()).collect();
        assert_eq!(contents, vec!["a", "é", "é", "€"]);
        let ids: Vec<_> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["doc/t@0", "doc/t@1", "doc/t@2", "doc/t@3"]);

        let merged = tree
            .repack(root, &Utf8Bytes, 3, "pages", "bytes", Some("t"))
            .unwrap();
        let contents: Vec<_> = merged.iter().filter_map(|r| r.content.as_deref()).collect();
        assert_eq!(contents, vec!["aé", "é", "€"]);
    }

    #[test]
    fn test_split_cjk_and_emoji_with_tiktoken() {
        let page = "日本語のテキストです。🎉🎊✨ 絵文字も含みます。".repeat(5);
        let oracle = TiktokenOracle::new();
        let page_tokens = oracle.count(&page, "cl100k_base").unwrap();

        for max_tokens in 1..=7 {
            let (mut tree, root) = document(&[page.as_str()]);
            let (merged, report) = tree
                .repack_with_report(root, &oracle, max_tokens, "pages", "cl100k_base", None)
                .unwrap();

            assert_eq!(report.split_chunks, 1);
            assert!(merged.len() <= page_tokens.div_ceil(max_tokens));
            assert!(merged.iter().all(|r| !r.content.as_deref().unwrap().is_empty()));
            assert_eq!(joined(&merged), page, "budget {max_tokens}");
        }
    }

    #[test]
    fn test_repeated_repacks_keep_arena_size() {
        let (mut tree, root) = document(&["a b ", "c ", "d "]);
        let nodes = tree.len();

        for _ in 0..100 {
            tree.repack(root, &WordTokenizer::default(), 2, "pages", "words", None)
                .unwrap();
        }

        assert_eq!(tree.len(), nodes);
    }

    #[test]
    fn test_empty_and_missing_groups() {
        let (mut tree, root) = document(&["", ""]);
        let merged = tree
            .repack(root, &WordTokenizer::default(), 5, "pages", "words", None)
            .unwrap();
        assert!(merged.is_empty());

        let merged = tree
            .repack(root, &WordTokenizer::default(), 5, "absent", "words", None)
            .unwrap();
        assert!(merged.is_empty());
        assert!(tree.record(root).unwrap().chunks.contains("absent:merged(5,words)"));
    }

    #[test]
    fn test_source_group_untouched() {
        let (mut tree, root) = document(&["a b ", "c "]);
        let before = tree.chunks(root, "pages").unwrap().to_vec();

        tree.repack(root, &WordTokenizer::default(), 1, "pages", "words", None)
            .unwrap();

        assert_eq!(tree.chunks(root, "pages").unwrap(), before.as_slice());
    }

    #[test]
    fn test_repack_resolves_offset_chunks() {
        let mut tree = DocumentTree::new();
        let root = tree
            .wrap(
                json!({
                    "id": "doc",
                    "content": "one two three four ",
                    "chunks": {"spans": [
                        {"start": 0, "length": 8},
                        {"start": 8, "length": 11}
                    ]}
                }),
                None,
            )
            .unwrap();

        let merged = tree
            .repack(root, &WordTokenizer::default(), 4, "spans", "words", None)
            .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].content.as_deref(), Some("one two three four "));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let (mut tree, root) = document(&["a "]);
        let err = tree
            .repack(root, &WordTokenizer::default(), 0, "pages", "words", None)
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidArgument { .. }));
    }

    #[test]
    fn test_tokenizer_errors_propagate() {
        let (mut tree, root) = document(&["a "]);
        let err = tree
            .repack(root, &WordTokenizer::default(), 5, "pages", "nope", None)
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Tokenizer(TokenizerError::UnknownEncoding { .. })
        ));

        let err = tree
            .repack(root, &BrokenDecoder, 1, "pages", "bytes", None)
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Tokenizer(TokenizerError::Decode { .. })
        ));
    }

    #[test]
    fn test_token_count() {
        let mut tree = DocumentTree::new();
        let root = tree.wrap(json!({"id": "doc", "content": "a b c "}), None).unwrap();
        let count = tree.token_count(root, &WordTokenizer::default(), "words").unwrap();
        assert_eq!(count, 3);
        assert_eq!(tree.record(root).unwrap().content.as_deref(), Some("a b c "));
    }
}

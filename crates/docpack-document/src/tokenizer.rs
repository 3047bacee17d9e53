//! Tokenizer oracle interface and the tiktoken-backed implementation.
//!
//! The repacker measures and splits text in token units through the [`Tokenizer`] trait. It
//! never looks inside a tokenizer: any type that can encode text to token ids and decode them
//! back under a named encoding will do.
//!
//! Decoding is expected to invert encoding for whole texts. With byte-level BPE encodings a
//! slice of a token sequence can end inside a multi-byte character, so such a slice has no
//! text of its own. [`Tokenizer::decode_bytes`] returns the raw bytes of a slice for callers
//! that stitch slices back together; an oracle that cannot do that falls back to `decode`,
//! whose output may then differ from the source bytes.

use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Arc, Mutex, PoisonError},
};

use tiktoken_rs::CoreBPE;

use crate::TokenizerError;

/// Identifier of a single token.
pub type TokenId = u32;

/// Encoding used when none is configured.
pub const DEFAULT_ENCODING: &str = "cl100k_base";

/// Encodings understood by [`TiktokenOracle`].
pub const TIKTOKEN_ENCODINGS: &[&str] = &[
    "cl100k_base",
    "o200k_base",
    "p50k_base",
    "p50k_edit",
    "r50k_base",
];

/// Converts between text and token sequences under a named encoding.
pub trait Tokenizer {
    /// Encodes `text` into an ordered token sequence.
    fn encode(&self, text: &str, encoding: &str) -> Result<Vec<TokenId>, TokenizerError>;

    /// Decodes a token sequence back into text.
    fn decode(&self, tokens: &[TokenId], encoding: &str) -> Result<String, TokenizerError>;

    /// Decodes a token sequence into bytes, which need not be valid UTF-8 on their own.
    fn decode_bytes(
        &self,
        tokens: &[TokenId],
        encoding: &str,
    ) -> Result<Vec<u8>, TokenizerError> {
        Ok(self.decode(tokens, encoding)?.into_bytes())
    }

    /// Returns the number of tokens in `text`.
    fn count(&self, text: &str, encoding: &str) -> Result<usize, TokenizerError> {
        Ok(self.encode(text, encoding)?.len())
    }
}

/// Tokenizer oracle backed by `tiktoken-rs`.
///
/// Loaded encodings are cached for the lifetime of the oracle, so one instance should be
/// reused across calls.
#[derive(Default)]
pub struct TiktokenOracle {
    /// Encodings loaded so far, keyed by name.
    cache: Mutex<HashMap<String, Arc<CoreBPE>>>,
}

impl TiktokenOracle {
    /// Creates an oracle with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the BPE for `encoding`, loading it on first use.
    fn bpe(&self, encoding: &str) -> Result<Arc<CoreBPE>, TokenizerError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bpe) = cache.get(encoding) {
            return Ok(Arc::clone(bpe));
        }

        let loaded = match encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "p50k_edit" => tiktoken_rs::p50k_edit(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            _ => {
                return Err(TokenizerError::UnknownEncoding {
                    encoding: encoding.to_string(),
                });
            }
        };
        let bpe = Arc::new(loaded.map_err(|e| TokenizerError::Load {
            encoding: encoding.to_string(),
            message: e.to_string(),
        })?);

        tracing::debug!(encoding, "loaded tiktoken encoding");
        cache.insert(encoding.to_string(), Arc::clone(&bpe));
        Ok(bpe)
    }
}

impl Tokenizer for TiktokenOracle {
    fn encode(&self, text: &str, encoding: &str) -> Result<Vec<TokenId>, TokenizerError> {
        // Special-token markers in document text are ordinary text here.
        Ok(self.bpe(encoding)?.encode_ordinary(text))
    }

    fn decode(&self, tokens: &[TokenId], encoding: &str) -> Result<String, TokenizerError> {
        self.bpe(encoding)?
            .decode(tokens.to_vec())
            .map_err(|e| decode_error(encoding, tokens, &e))
    }

    fn decode_bytes(
        &self,
        tokens: &[TokenId],
        encoding: &str,
    ) -> Result<Vec<u8>, TokenizerError> {
        let bpe = self.bpe(encoding)?;
        match bpe.decode(tokens.to_vec()) {
            Ok(text) => Ok(text.into_bytes()),
            // A UTF-8 failure means every id was known; unknown ids fail with a key error.
            Err(e) if e.downcast_ref::<String>().is_some() => {
                Ok(bpe._decode_native_and_split(tokens.to_vec()).flatten().collect())
            }
            Err(e) => Err(decode_error(encoding, tokens, &e)),
        }
    }
}

/// Builds the error for a failed decode of `tokens`.
fn decode_error(encoding: &str, tokens: &[TokenId], err: &impl Display) -> TokenizerError {
    TokenizerError::Decode {
        encoding: encoding.to_string(),
        count: tokens.len(),
        message: err.to_string(),
    }
}

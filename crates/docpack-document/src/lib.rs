//! Document and chunk model for docpack.
//!
//! A document is a JSON record whose text is stored in one of three ways:
//! - directly, in its `content` field;
//! - as a byte range of a parent document's text (`start` and `length`);
//! - as the concatenation of a named group of child chunks (`content_chunk_group`).
//!
//! Records are wrapped into a [`DocumentTree`] arena, which resolves their text and repacks
//! chunk groups into new groups bounded by a token budget measured through a [`Tokenizer`].

#![warn(missing_docs)]

mod error;
mod record;
mod repack;
mod resolve;
mod tokenizer;
mod tree;

pub use error::{DocumentError, TokenizerError};
pub use record::{ChunkGroups, RawRecord};
pub use repack::{RepackReport, default_target_group};
pub use tokenizer::{DEFAULT_ENCODING, TIKTOKEN_ENCODINGS, TiktokenOracle, TokenId, Tokenizer};
pub use tree::{DEFAULT_MAX_DEPTH, DocumentTree, NodeId};

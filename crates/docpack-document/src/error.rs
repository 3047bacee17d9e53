//! Error types for the document model.

use thiserror::Error;

/// Errors raised by a tokenizer oracle.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// The requested encoding is not known to the oracle.
    #[error("unknown encoding: {encoding}")]
    UnknownEncoding {
        /// Name of the requested encoding.
        encoding: String,
    },

    /// The oracle failed to load the data for an encoding.
    #[error("failed to load encoding {encoding}: {message}")]
    Load {
        /// Name of the encoding being loaded.
        encoding: String,
        /// Description of the failure.
        message: String,
    },

    /// A token sequence could not be turned back into text.
    #[error("failed to decode {count} tokens under {encoding}: {message}")]
    Decode {
        /// Encoding used for decoding.
        encoding: String,
        /// Number of tokens in the rejected sequence.
        count: usize,
        /// Description of the failure.
        message: String,
    },
}

/// Errors that can occur when building, resolving, or repacking documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A value that is not a structured record was offered for wrapping, or an argument was out
    /// of range.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument.
        message: String,
    },

    /// A JSON object did not match the record schema.
    #[error("invalid record: {source}")]
    InvalidRecord {
        /// Underlying deserialization error.
        #[from]
        source: serde_json::Error,
    },

    /// A byte range does not fit the parent's resolved content.
    #[error(
        "invalid offsets on {id}: [{start}, {start}+{length}) does not fit parent content of {parent_len} bytes"
    )]
    InvalidOffsets {
        /// Identifier of the record carrying the offsets.
        id: String,
        /// Requested start offset.
        start: i64,
        /// Requested length.
        length: i64,
        /// Byte length of the parent's resolved content.
        parent_len: usize,
    },

    /// A node handle does not belong to this tree.
    #[error("unknown node: {index}")]
    UnknownNode {
        /// Arena index of the missing node.
        index: usize,
    },

    /// A wrapped chunk points at a group slot that no longer exists.
    #[error("chunk {index} of group '{group}' no longer exists")]
    StaleChunk {
        /// Group the chunk was wrapped from.
        group: String,
        /// Position the chunk was wrapped from.
        index: usize,
    },

    /// Linking a parent would make a node its own ancestor.
    #[error("setting parent of {id} would create a cycle")]
    CyclicParent {
        /// Identifier of the node being re-parented.
        id: String,
    },

    /// Resolution re-entered a record that is already being resolved.
    #[error("cyclic content reference through {id}")]
    CyclicReference {
        /// Identifier of the record reached twice.
        id: String,
    },

    /// Resolution recursed deeper than the configured limit.
    #[error("content resolution exceeded maximum depth of {max_depth}")]
    DepthExceeded {
        /// The configured limit.
        max_depth: usize,
    },

    /// The tokenizer oracle failed.
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
}

//! Content resolution.
//!
//! A record's effective text comes from the first source that applies:
//!
//! 1. its direct `content`;
//! 2. a byte range `[start, start + length)` of its live parent's resolved content;
//! 3. the concatenation, in stored order, of the records in its `content_chunk_group`;
//! 4. otherwise the empty string.
//!
//! Members of a content group are resolved with the grouping record as their parent, so offsets
//! inside a group address the grouping record's own text. Since that text may itself be built
//! from the group, resolution tracks the records it is inside of and fails on re-entry rather
//! than recursing forever.

use std::ptr;

use crate::{DocumentError, DocumentTree, NodeId, RawRecord};

/// The parent a record is resolved against.
#[derive(Debug, Clone, Copy)]
enum Scope<'t, 's> {
    /// No live parent.
    Detached,
    /// A node in the arena.
    Node(NodeId),
    /// A group member's owner, which has no node of its own.
    Record(&'t RawRecord, &'s Scope<'t, 's>),
}

/// Single resolution pass over a tree.
struct Resolver<'t> {
    /// Tree being read.
    tree: &'t DocumentTree,
    /// Records currently being resolved, outermost first.
    active: Vec<&'t RawRecord>,
}

impl<'t> Resolver<'t> {
    /// Resolves an arena node against its live parent.
    fn node(&mut self, id: NodeId) -> Result<String, DocumentError> {
        let record = self.tree.record(id)?;
        let scope = match self.tree.parent(id)? {
            Some(parent) => Scope::Node(parent),
            None => Scope::Detached,
        };
        self.record(record, scope)
    }

    /// Resolves the text of a parent scope.
    fn scope(&mut self, scope: Scope<'t, '_>) -> Result<String, DocumentError> {
        match scope {
            Scope::Detached => Ok(String::new()),
            Scope::Node(id) => self.node(id),
            Scope::Record(record, parent) => self.record(record, *parent),
        }
    }

    /// Resolves one record, guarding against cycles and runaway depth.
    fn record(
        &mut self,
        record: &'t RawRecord,
        parent: Scope<'t, '_>,
    ) -> Result<String, DocumentError> {
        if self.active.iter().any(|r| ptr::eq(*r, record)) {
            return Err(DocumentError::CyclicReference {
                id: record.id.clone(),
            });
        }
        if self.active.len() >= self.tree.max_depth() {
            return Err(DocumentError::DepthExceeded {
                max_depth: self.tree.max_depth(),
            });
        }

        self.active.push(record);
        let result = self.sources(record, parent);
        self.active.pop();
        result
    }

    /// Tries each content source in priority order.
    fn sources(
        &mut self,
        record: &'t RawRecord,
        parent: Scope<'t, '_>,
    ) -> Result<String, DocumentError> {
        if let Some(content) = &record.content {
            return Ok(content.clone());
        }

        if let Some((start, length)) = record.offsets()
            && !matches!(parent, Scope::Detached)
        {
            let text = self.scope(parent)?;
            tracing::trace!(id = %record.id, start, length, "resolving parent range");
            return slice(record, &text, start, length);
        }

        if let Some(group) = &record.content_chunk_group {
            tracing::trace!(id = %record.id, group = %group, "reassembling chunk group");
            let owner = Scope::Record(record, &parent);
            let mut combined = String::new();
            for member in record.chunks.get(group) {
                combined.push_str(&self.record(member, owner)?);
            }
            return Ok(combined);
        }

        Ok(String::new())
    }
}

/// Extracts `[start, start + length)` from `text`, rejecting ranges that do not fit.
fn slice(
    record: &RawRecord,
    text: &str,
    start: i64,
    length: i64,
) -> Result<String, DocumentError> {
    let invalid = || DocumentError::InvalidOffsets {
        id: record.id.clone(),
        start,
        length,
        parent_len: text.len(),
    };

    let begin = usize::try_from(start).map_err(|_| invalid())?;
    let len = usize::try_from(length).map_err(|_| invalid())?;
    let end = begin.checked_add(len).ok_or_else(invalid)?;
    text.get(begin..end).map(str::to_string).ok_or_else(invalid)
}

#[allow(clippy::multiple_inherent_impl)]
impl DocumentTree {
    /// Computes the effective text of `id`.
    ///
    /// Fails with `InvalidOffsets` when a byte range does not fit (or does not fall on character
    /// boundaries of) the parent's text, with `CyclicReference` when a record's text depends on
    /// itself, and with `DepthExceeded` past the tree's depth limit. A record with no content
    /// source resolves to the empty string.
    pub fn resolve_content(&self, id: NodeId) -> Result<String, DocumentError> {
        Resolver {
            tree: self,
            active: Vec::new(),
        }
        .node(id)
    }

    /// Computes the effective text of record `index` in `group` of `id`.
    ///
    /// The member resolves exactly as its node from [`Self::wrapped_chunks`] would, without
    /// adding nodes to the arena. Fails with `StaleChunk` if the group has no such record.
    pub fn resolve_chunk(
        &self,
        id: NodeId,
        group: &str,
        index: usize,
    ) -> Result<String, DocumentError> {
        let record = self
            .chunks(id, group)?
            .get(index)
            .ok_or_else(|| DocumentError::StaleChunk {
                group: group.to_string(),
                index,
            })?;
        Resolver {
            tree: self,
            active: Vec::new(),
        }
        .record(record, Scope::Node(id))
    }
}

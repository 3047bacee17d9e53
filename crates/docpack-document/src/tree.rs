//! Arena of document nodes.
//!
//! A `DocumentTree` owns every node wrapped through it. Nodes refer to each other by
//! [`NodeId`]; none of those links own anything. A node's record is either held by the node
//! itself (a wrapped root) or lives inside another node's chunk group, in which case every read
//! and write through the node goes to that slot of the owner's record.

use serde_json::Value;

use crate::{DocumentError, RawRecord};

/// Default bound on recursion while resolving content.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Handle to a node in a [`DocumentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a node's record is stored.
#[derive(Debug, Clone)]
enum Storage {
    /// The node owns its record.
    Owned(RawRecord),
    /// The record is `index` within `group` of the owner's record.
    Chunk {
        /// Node whose record holds the group.
        owner: NodeId,
        /// Group name.
        group: String,
        /// Position within the group.
        index: usize,
    },
}

/// A single arena slot.
#[derive(Debug, Clone)]
struct Slot {
    /// Record storage.
    storage: Storage,
    /// Live parent used for offset resolution.
    parent: Option<NodeId>,
    /// Preceding sibling when wrapped from a group.
    previous: Option<NodeId>,
    /// Following sibling when wrapped from a group.
    next: Option<NodeId>,
}

/// Owning arena of document nodes.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    /// All nodes, addressed by `NodeId`.
    nodes: Vec<Slot>,
    /// Recursion limit for content resolution.
    max_depth: usize,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree {
    /// Creates an empty tree with the default resolution depth limit.
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Creates an empty tree that fails resolution past `max_depth` nested steps.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            nodes: Vec::new(),
            max_depth,
        }
    }

    /// Returns the resolution depth limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns the number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if nothing has been wrapped yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Wraps a JSON value as a new node.
    ///
    /// Fails with `InvalidArgument` if `value` is not an object, and with `InvalidRecord` if the
    /// object does not match the record schema. `parent` must already be part of this tree.
    pub fn wrap(&mut self, value: Value, parent: Option<NodeId>) -> Result<NodeId, DocumentError> {
        if !value.is_object() {
            return Err(DocumentError::InvalidArgument {
                message: format!("expected a JSON object, found {}", json_kind(&value)),
            });
        }
        let record: RawRecord = serde_json::from_value(value)?;
        self.wrap_record(record, parent)
    }

    /// Wraps an already-typed record as a new node.
    pub fn wrap_record(
        &mut self,
        record: RawRecord,
        parent: Option<NodeId>,
    ) -> Result<NodeId, DocumentError> {
        if let Some(parent) = parent {
            self.slot(parent)?;
        }
        Ok(self.push(Storage::Owned(record), parent))
    }

    /// Appends a slot and returns its handle.
    fn push(&mut self, storage: Storage, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Slot {
            storage,
            parent,
            previous: None,
            next: None,
        });
        id
    }

    /// Looks up a slot.
    fn slot(&self, id: NodeId) -> Result<&Slot, DocumentError> {
        self.nodes
            .get(id.0)
            .ok_or(DocumentError::UnknownNode { index: id.0 })
    }

    /// Looks up a slot mutably.
    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot, DocumentError> {
        self.nodes
            .get_mut(id.0)
            .ok_or(DocumentError::UnknownNode { index: id.0 })
    }

    /// Returns the record backing `id`. This is the live record, not a copy.
    pub fn record(&self, id: NodeId) -> Result<&RawRecord, DocumentError> {
        match &self.slot(id)?.storage {
            Storage::Owned(record) => Ok(record),
            Storage::Chunk {
                owner,
                group,
                index,
            } => self
                .record(*owner)?
                .chunks
                .get(group)
                .get(*index)
                .ok_or_else(|| stale(group, *index)),
        }
    }

    /// Returns the record backing `id` mutably. Writes land in the owning record in place.
    pub fn record_mut(&mut self, id: NodeId) -> Result<&mut RawRecord, DocumentError> {
        // Walk up to the owned root, remembering the group slots passed on the way.
        let mut path = Vec::new();
        let mut current = id;
        while let Storage::Chunk {
            owner,
            group,
            index,
        } = &self.slot(current)?.storage
        {
            path.push((group.clone(), *index));
            current = *owner;
        }

        let mut record = match &mut self.slot_mut(current)?.storage {
            Storage::Owned(record) => record,
            Storage::Chunk { .. } => return Err(DocumentError::UnknownNode { index: current.0 }),
        };
        for (group, index) in path.iter().rev() {
            record = record
                .chunks
                .get_mut(group)
                .and_then(|records| records.get_mut(*index))
                .ok_or_else(|| stale(group, *index))?;
        }
        Ok(record)
    }

    /// Returns the record identifier of `id`.
    pub fn id(&self, id: NodeId) -> Result<&str, DocumentError> {
        Ok(&self.record(id)?.id)
    }

    /// Returns the live parent of `id`.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, DocumentError> {
        Ok(self.slot(id)?.parent)
    }

    /// Returns the preceding chunk when `id` was produced by [`Self::wrapped_chunks`].
    pub fn previous_chunk(&self, id: NodeId) -> Result<Option<NodeId>, DocumentError> {
        Ok(self.slot(id)?.previous)
    }

    /// Returns the following chunk when `id` was produced by [`Self::wrapped_chunks`].
    pub fn next_chunk(&self, id: NodeId) -> Result<Option<NodeId>, DocumentError> {
        Ok(self.slot(id)?.next)
    }

    /// Links `id` to a new live parent.
    ///
    /// Fails with `CyclicParent` if `id` is reachable from `parent` through the parent chain.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<(), DocumentError> {
        self.slot(id)?;
        let mut ancestor = parent;
        while let Some(current) = ancestor {
            if current == id {
                return Err(DocumentError::CyclicParent {
                    id: self.id(id)?.to_string(),
                });
            }
            ancestor = self.slot(current)?.parent;
        }
        self.slot_mut(id)?.parent = parent;
        Ok(())
    }

    /// Returns the raw records of `group`, or an empty slice if the group is absent.
    pub fn chunks(&self, id: NodeId, group: &str) -> Result<&[RawRecord], DocumentError> {
        Ok(self.record(id)?.chunks.get(group))
    }

    /// Wraps every record of `group` as a node whose parent is `id`.
    ///
    /// The returned nodes are linked in stored order through [`Self::previous_chunk`] and
    /// [`Self::next_chunk`]. They are views into `id`'s record: writes through them modify the
    /// group in place.
    pub fn wrapped_chunks(
        &mut self,
        id: NodeId,
        group: &str,
    ) -> Result<Vec<NodeId>, DocumentError> {
        let count = self.chunks(id, group)?.len();
        let wrapped: Vec<NodeId> = (0..count)
            .map(|index| {
                self.push(
                    Storage::Chunk {
                        owner: id,
                        group: group.to_string(),
                        index,
                    },
                    Some(id),
                )
            })
            .collect();

        for pair in wrapped.windows(2) {
            self.nodes[pair[0].0].next = Some(pair[1]);
            self.nodes[pair[1].0].previous = Some(pair[0]);
        }
        Ok(wrapped)
    }

    /// Replaces the records of `group`, creating the group if absent.
    pub fn set_chunks(
        &mut self,
        id: NodeId,
        group: &str,
        records: Vec<RawRecord>,
    ) -> Result<(), DocumentError> {
        self.record_mut(id)?.chunks.set(group, records);
        Ok(())
    }

    /// Appends a record to `group`, creating the group if absent.
    pub fn add_chunk(
        &mut self,
        id: NodeId,
        group: &str,
        record: RawRecord,
    ) -> Result<(), DocumentError> {
        self.record_mut(id)?.chunks.push(group, record);
        Ok(())
    }

    /// Sets the record identifier.
    pub fn set_id(&mut self, id: NodeId, value: impl Into<String>) -> Result<(), DocumentError> {
        self.record_mut(id)?.id = value.into();
        Ok(())
    }

    /// Sets or clears direct content.
    pub fn set_content(
        &mut self,
        id: NodeId,
        content: Option<String>,
    ) -> Result<(), DocumentError> {
        self.record_mut(id)?.content = content;
        Ok(())
    }

    /// Sets or clears the informational parent identifier.
    pub fn set_parent_id(
        &mut self,
        id: NodeId,
        parent_id: Option<String>,
    ) -> Result<(), DocumentError> {
        self.record_mut(id)?.parent = parent_id;
        Ok(())
    }

    /// Sets or clears the byte range into the live parent's content.
    pub fn set_offsets(
        &mut self,
        id: NodeId,
        offsets: Option<(i64, i64)>,
    ) -> Result<(), DocumentError> {
        let record = self.record_mut(id)?;
        record.start = offsets.map(|(start, _)| start);
        record.length = offsets.map(|(_, length)| length);
        Ok(())
    }

    /// Sets or clears the group used to reassemble content.
    pub fn set_content_chunk_group(
        &mut self,
        id: NodeId,
        group: Option<String>,
    ) -> Result<(), DocumentError> {
        self.record_mut(id)?.content_chunk_group = group;
        Ok(())
    }
}

/// Builds the error for a chunk slot that has gone away.
fn stale(group: &str, index: usize) -> DocumentError {
    DocumentError::StaleChunk {
        group: group.to_string(),
        index,
    }
}

/// Names the JSON type of a value for error messages.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

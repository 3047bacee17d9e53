//! Raw document records and chunk group storage.
//!
//! A `RawRecord` is the serialized shape of a document or chunk. Records nest: each one may
//! carry named chunk groups holding further records. Fields the model does not know about are
//! kept in `extra` so they survive a load/save cycle untouched.

use std::collections::{BTreeMap, btree_map};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A document or chunk as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Record identifier, unique within its owning tree.
    #[serde(default)]
    pub id: String,

    /// Direct text content. When present it is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Identifier of the parent document. Informational only, never resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Byte offset into the live parent's resolved content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,

    /// Byte length of the range starting at `start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,

    /// Name of the chunk group whose members, concatenated, form this record's content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_chunk_group: Option<String>,

    /// Named chunk groups owned by this record.
    #[serde(default, skip_serializing_if = "ChunkGroups::is_absent")]
    pub chunks: ChunkGroups,

    /// Any other fields present in the source record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawRecord {
    /// Creates a record holding direct content.
    pub fn with_content(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Creates a record addressing `[start, start + length)` of its parent's content.
    pub fn with_offsets(id: impl Into<String>, start: i64, length: i64) -> Self {
        Self {
            id: id.into(),
            start: Some(start),
            length: Some(length),
            ..Self::default()
        }
    }

    /// Returns `start` and `length` when both are present.
    pub fn offsets(&self) -> Option<(i64, i64)> {
        self.start.zip(self.length)
    }
}

/// Ordered mapping from group name to an ordered sequence of chunk records.
///
/// Looking up an absent group yields an empty slice. The records inside a group keep the order
/// they were stored in; nothing here ever re-sorts them. A map read from the wire is written
/// back even when it has no groups.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ChunkGroups {
    /// Records by group name.
    groups: BTreeMap<String, Vec<RawRecord>>,
    /// Set when the map was deserialized.
    #[serde(skip)]
    loaded: bool,
}

impl<'de> Deserialize<'de> for ChunkGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self {
            groups: BTreeMap::deserialize(deserializer)?,
            loaded: true,
        })
    }
}

impl PartialEq for ChunkGroups {
    fn eq(&self, other: &Self) -> bool {
        self.groups == other.groups
    }
}

impl ChunkGroups {
    /// Returns the records in `group`, or an empty slice if the group does not exist.
    pub fn get(&self, group: &str) -> &[RawRecord] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns a mutable handle to the records in `group`, if it exists.
    pub fn get_mut(&mut self, group: &str) -> Option<&mut Vec<RawRecord>> {
        self.groups.get_mut(group)
    }

    /// Replaces the records of `group`, creating it if absent.
    pub fn set(&mut self, group: impl Into<String>, records: Vec<RawRecord>) {
        self.groups.insert(group.into(), records);
    }

    /// Appends a record to `group`, creating it if absent.
    pub fn push(&mut self, group: impl Into<String>, record: RawRecord) {
        self.groups.entry(group.into()).or_default().push(record);
    }

    /// Returns true if `group` exists, even when it is empty.
    pub fn contains(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Iterates over group names and their records, ordered by name.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<RawRecord>> {
        self.groups.iter()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns true if there are no groups and the map was not read from the wire.
    fn is_absent(&self) -> bool {
        self.is_empty() && !self.loaded
    }
}

impl<'a> IntoIterator for &'a ChunkGroups {
    type Item = (&'a String, &'a Vec<RawRecord>);
    type IntoIter = btree_map::Iter<'a, String, Vec<RawRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

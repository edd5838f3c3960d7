//! Shared types produced by the indexing pipeline.
//!
//! These types make up the snapshot handed to the serving layer and are
//! serialized to JSON by the `index` command, so every stage agrees on them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// What a matched file is, derived solely from its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Image,
    MetadataRecord,
    ContentFragment,
}

impl FileKind {
    /// Stable tag used in reports and fingerprints.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::MetadataRecord => "metadata_record",
            FileKind::ContentFragment => "content_fragment",
        }
    }
}

/// A classified file, addressed by its `/`-separated path relative to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedFile {
    pub kind: FileKind,
    pub path: String,
}

impl TypedFile {
    pub fn new(kind: FileKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// One page worth of review material.
///
/// Files keep the order in which they were handed to the indexer; they are
/// never re-sorted inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub key: String,
    pub files: Vec<TypedFile>,
}

impl Group {
    pub fn files_of(&self, kind: FileKind) -> impl Iterator<Item = &TypedFile> {
        self.files.iter().filter(move |f| f.kind == kind)
    }

    pub fn images(&self) -> impl Iterator<Item = &TypedFile> {
        self.files_of(FileKind::Image)
    }

    pub fn fragments(&self) -> impl Iterator<Item = &TypedFile> {
        self.files_of(FileKind::ContentFragment)
    }

    pub fn metadata_records(&self) -> impl Iterator<Item = &TypedFile> {
        self.files_of(FileKind::MetadataRecord)
    }
}

/// Groups sorted by key. Position `i` (0-based) is page `i + 1`.
///
/// Only the indexer constructs one; afterwards it is read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupIndex {
    groups: Vec<Group>,
}

impl GroupIndex {
    /// Caller guarantees `groups` is sorted by key with unique keys.
    pub(crate) fn from_sorted(groups: Vec<Group>) -> Self {
        debug_assert!(groups.windows(2).all(|w| w[0].key < w[1].key));
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Group> {
        self.groups.iter()
    }

    pub fn as_slice(&self) -> &[Group] {
        &self.groups
    }

    /// Look up a 1-based page number.
    pub fn page(&self, page: usize) -> Option<&Group> {
        page.checked_sub(1).and_then(|i| self.groups.get(i))
    }

    /// 1-based page number of a group key.
    pub fn page_of(&self, key: &str) -> Option<usize> {
        self.groups
            .binary_search_by(|g| g.key.as_str().cmp(key))
            .ok()
            .map(|i| i + 1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.key.as_str())
    }
}

impl<'a> IntoIterator for &'a GroupIndex {
    type Item = &'a Group;
    type IntoIter = std::slice::Iter<'a, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// A parsed metadata file: JSON object, keys in document order.
pub type MetadataRecord = Map<String, Value>;

/// Every metadata key seen during aggregation, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetadataSchema {
    keys: Vec<String>,
}

impl MetadataSchema {
    /// Append `key` unless it is already known. Returns whether it was new.
    pub(crate) fn observe(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.keys.push(key.to_string());
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Merged metadata per group key.
///
/// Groups without any valid metadata file have no entry at all, which is
/// distinct from an entry holding an empty record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GroupMetadata {
    records: BTreeMap<String, MetadataRecord>,
}

impl GroupMetadata {
    pub fn get(&self, group_key: &str) -> Option<&MetadataRecord> {
        self.records.get(group_key)
    }

    pub fn contains(&self, group_key: &str) -> bool {
        self.records.contains_key(group_key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `record` into the group's entry, later keys overwriting earlier ones.
    pub(crate) fn merge(&mut self, group_key: &str, record: MetadataRecord) {
        let entry = self.records.entry(group_key.to_string()).or_default();
        for (key, value) in record {
            entry.insert(key, value);
        }
    }
}

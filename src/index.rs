//! Classification and grouping.
//!
//! Turns the kept files into the page sequence. Each file is classified by
//! the suffix the scanner detected, then placed into a group keyed by its
//! containing directory:
//!
//! ```text
//! a/b/img.png               → group "a/b"
//! a/b/reviewer2_content.html → group "a/b"
//! loose.png                 → group "loose.png"  (no parent, singleton)
//! ```
//!
//! Groups are then sorted by key (byte order, case-sensitive). That order is
//! the page contract: page `i` shows group `i - 1`.

use crate::exclude::KeptFile;
use crate::types::{FileKind, Group, GroupIndex, TypedFile};
use std::collections::BTreeMap;
use thiserror::Error;

/// Marks a file as the metadata record of its group.
pub const METADATA_SUFFIX: &str = "reviewer2_metadata.json";

/// Marks a file as an HTML content fragment of its group.
pub const CONTENT_SUFFIX: &str = "reviewer2_content.html";

pub const DEFAULT_IMAGE_SUFFIXES: &[&str] = &["svg", "png", "jpeg", "jpg", "gif", "webp"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unexpected file suffix '{suffix}' for {path}")]
pub struct ClassificationError {
    pub path: String,
    pub suffix: String,
}

/// Ordered suffix → kind mapping.
///
/// Structural suffixes come first so they win over any image suffix that
/// happens to overlap with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixTable {
    entries: Vec<(String, FileKind)>,
}

impl SuffixTable {
    pub fn new<S: AsRef<str>>(image_suffixes: &[S]) -> Self {
        let mut entries = vec![
            (METADATA_SUFFIX.to_string(), FileKind::MetadataRecord),
            (CONTENT_SUFFIX.to_string(), FileKind::ContentFragment),
        ];
        for suffix in image_suffixes {
            let suffix = suffix.as_ref();
            if !entries.iter().any(|(s, _)| s == suffix) {
                entries.push((suffix.to_string(), FileKind::Image));
            }
        }
        Self { entries }
    }

    /// Suffixes in lookup order, as handed to the scanner.
    pub fn suffixes(&self) -> Vec<String> {
        self.entries.iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn kind_of(&self, suffix: &str) -> Option<FileKind> {
        self.entries
            .iter()
            .find(|(s, _)| s == suffix)
            .map(|(_, kind)| *kind)
    }
}

impl Default for SuffixTable {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_SUFFIXES)
    }
}

/// Classify kept files, preserving their order.
pub fn classify(
    kept: &[KeptFile],
    table: &SuffixTable,
) -> Result<Vec<TypedFile>, ClassificationError> {
    kept.iter()
        .map(|k| match table.kind_of(&k.file.suffix) {
            Some(kind) => Ok(TypedFile::new(kind, k.relative.clone())),
            None => Err(ClassificationError {
                path: k.relative.clone(),
                suffix: k.file.suffix.clone(),
            }),
        })
        .collect()
}

/// The group a relative path belongs to: its parent directory, or the path
/// itself when it sits directly in the root.
pub fn group_key(relative: &str) -> &str {
    match relative.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => parent,
        _ => relative,
    }
}

/// Group files by key and sort the groups into page order.
pub fn index(files: Vec<TypedFile>) -> GroupIndex {
    let mut by_key: BTreeMap<String, Vec<TypedFile>> = BTreeMap::new();
    for file in files {
        let key = group_key(&file.path).to_string();
        by_key.entry(key).or_default().push(file);
    }

    let groups = by_key
        .into_iter()
        .map(|(key, files)| Group { key, files })
        .collect();

    GroupIndex::from_sorted(groups)
}

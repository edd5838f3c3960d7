//! Metadata aggregation.
//!
//! Each group may carry one or more `reviewer2_metadata.json` files holding a
//! JSON object. Aggregation walks the groups in page order and, within a
//! group, the metadata files in group order:
//!
//! - **Merge**: records of the same group are merged key by key; a later
//!   file overwrites colliding keys of an earlier one.
//! - **Schema**: every key is appended to the global schema the first time
//!   it is seen. With `{x, y}` on page 1 and `{y, z}` on page 2 the schema is
//!   `[x, y, z]`.
//! - **Soft failure**: a file that cannot be read, is not valid JSON, or is
//!   not an object is skipped and reported. It never aborts the build, and a
//!   group whose metadata files all failed gets no entry.

use crate::types::{GroupIndex, GroupMetadata, MetadataSchema};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} doesn't contain a JSON object")]
    NotRecord { path: PathBuf },
}

/// A metadata file that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataIssue {
    pub group: String,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub schema: MetadataSchema,
    pub metadata: GroupMetadata,
    pub issues: Vec<MetadataIssue>,
}

/// Loader reading metadata files relative to `root`.
pub fn json_file_loader(root: &Path) -> impl FnMut(&str) -> Result<Value, MetadataError> + '_ {
    move |relative| {
        let path = root.join(relative);
        let content = std::fs::read_to_string(&path).map_err(|source| MetadataError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| MetadataError::Parse { path, source })
    }
}

/// Merge all metadata records of `groups` using `load` to fetch each file.
pub fn aggregate<L>(groups: &GroupIndex, mut load: L) -> Aggregate
where
    L: FnMut(&str) -> Result<Value, MetadataError>,
{
    let mut aggregate = Aggregate::default();
    let mut parsed = 0usize;

    for group in groups {
        for file in group.metadata_records() {
            let record = match load(&file.path) {
                Ok(Value::Object(record)) => record,
                Ok(_) => {
                    let err = MetadataError::NotRecord {
                        path: PathBuf::from(&file.path),
                    };
                    aggregate.report(&group.key, &file.path, err);
                    continue;
                }
                Err(err) => {
                    aggregate.report(&group.key, &file.path, err);
                    continue;
                }
            };

            debug!(
                path = %file.path,
                entries = record.len(),
                "Parsed metadata entries"
            );
            for key in record.keys() {
                aggregate.schema.observe(key);
            }
            aggregate.metadata.merge(&group.key, record);
            parsed += 1;
        }
    }

    info!(
        files = parsed,
        groups = aggregate.metadata.len(),
        columns = %aggregate.schema.keys().join(", "),
        skipped = aggregate.issues.len(),
        "Aggregated metadata"
    );

    aggregate
}

impl Aggregate {
    fn report(&mut self, group: &str, path: &str, err: MetadataError) {
        warn!(group = %group, path = %path, error = %err, "Skipping metadata file");
        self.issues.push(MetadataIssue {
            group: group.to_string(),
            path: path.to_string(),
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index;
    use crate::types::{FileKind, TypedFile};
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn meta(path: &str) -> TypedFile {
        TypedFile::new(FileKind::MetadataRecord, path)
    }

    fn image(path: &str) -> TypedFile {
        TypedFile::new(FileKind::Image, path)
    }

    /// Loader backed by an in-memory map of raw JSON text.
    fn memory_loader(
        files: &[(&str, &str)],
    ) -> impl FnMut(&str) -> Result<Value, MetadataError> + use<> {
        let files: HashMap<String, String> = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        move |relative| {
            let content = files.get(relative).ok_or_else(|| MetadataError::Io {
                path: PathBuf::from(relative),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })?;
            serde_json::from_str(content).map_err(|source| MetadataError::Parse {
                path: PathBuf::from(relative),
                source,
            })
        }
    }

    #[test]
    fn schema_is_first_seen_across_groups() {
        let groups = index::index(vec![meta("g2/m.json"), meta("g1/m.json")]);
        let agg = aggregate(
            &groups,
            memory_loader(&[
                ("g1/m.json", r#"{"x": 1, "y": 2}"#),
                ("g2/m.json", r#"{"y": 3, "z": 4}"#),
            ]),
        );
        assert_eq!(agg.schema.keys(), ["x", "y", "z"]);
    }

    #[test]
    fn schema_keeps_document_key_order() {
        let groups = index::index(vec![meta("g/m.json")]);
        let agg = aggregate(
            &groups,
            memory_loader(&[("g/m.json", r#"{"zeta": 1, "alpha": 2}"#)]),
        );
        assert_eq!(agg.schema.keys(), ["zeta", "alpha"]);
    }

    #[test]
    fn later_file_wins_within_group() {
        let groups = index::index(vec![meta("g/first.json"), meta("g/second.json")]);
        let agg = aggregate(
            &groups,
            memory_loader(&[
                ("g/first.json", r#"{"a": 1, "b": 2}"#),
                ("g/second.json", r#"{"b": 3, "c": 4}"#),
            ]),
        );
        assert_eq!(
            Value::Object(agg.metadata.get("g").unwrap().clone()),
            json!({"a": 1, "b": 3, "c": 4})
        );
    }

    #[test]
    fn groups_without_metadata_have_no_entry() {
        let groups = index::index(vec![image("plain/a.png"), meta("tagged/m.json")]);
        let agg = aggregate(&groups, memory_loader(&[("tagged/m.json", "{}")]));
        assert!(!agg.metadata.contains("plain"));
        // An empty object still yields an entry.
        assert!(agg.metadata.get("tagged").unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_skipped_and_reported() {
        let groups = index::index(vec![
            meta("a/m.json"),
            meta("b/m.json"),
            meta("c/m.json"),
        ]);
        let agg = aggregate(
            &groups,
            memory_loader(&[
                ("a/m.json", r#"{"label": "cat"}"#),
                ("b/m.json", r#"{"label": "#),
                ("c/m.json", r#"{"label": "dog"}"#),
            ]),
        );
        assert_eq!(agg.metadata.len(), 2);
        assert!(!agg.metadata.contains("b"));
        assert_eq!(agg.issues.len(), 1);
        assert_eq!(agg.issues[0].group, "b");
        assert!(agg.issues[0].message.contains("Unable to parse"));
    }

    #[test]
    fn non_object_is_skipped() {
        let groups = index::index(vec![meta("g/m.json")]);
        let agg = aggregate(&groups, memory_loader(&[("g/m.json", "[1, 2, 3]")]));
        assert!(agg.metadata.is_empty());
        assert!(agg.schema.is_empty());
        assert!(agg.issues[0].message.contains("doesn't contain a JSON object"));
    }

    #[test]
    fn bad_file_does_not_drop_good_sibling() {
        let groups = index::index(vec![meta("g/bad.json"), meta("g/good.json")]);
        let agg = aggregate(
            &groups,
            memory_loader(&[("g/bad.json", "nope"), ("g/good.json", r#"{"k": true}"#)]),
        );
        assert_eq!(
            Value::Object(agg.metadata.get("g").unwrap().clone()),
            json!({"k": true})
        );
    }

    #[test]
    fn file_loader_reads_relative_to_root() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(
            tmp.path().join("a/b/reviewer2_metadata.json"),
            r#"{"label": "cat"}"#,
        )
        .unwrap();

        let groups = index::index(vec![meta("a/b/reviewer2_metadata.json")]);
        let agg = aggregate(&groups, json_file_loader(tmp.path()));
        assert_eq!(agg.metadata.get("a/b").unwrap()["label"], json!("cat"));
    }

    #[test]
    fn file_loader_missing_file_is_issue() {
        let tmp = TempDir::new().unwrap();
        let groups = index::index(vec![meta("gone/reviewer2_metadata.json")]);
        let agg = aggregate(&groups, json_file_loader(tmp.path()));
        assert!(agg.metadata.is_empty());
        assert!(agg.issues[0].message.contains("Unable to read"));
    }
}

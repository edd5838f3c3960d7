//! Index snapshots.
//!
//! A [`Snapshot`] is the complete, read-only result of one pass over the
//! review root:
//!
//! ```text
//! scan → exclude → classify + group → aggregate metadata → Snapshot
//! ```
//!
//! Fatal errors (invalid config, unreadable root, unclassifiable file) abort
//! the build and nothing is published. Bad metadata files only end up in
//! [`Snapshot::issues`].
//!
//! [`SnapshotStore`] is what a long-running server holds: readers take an
//! `Arc<Snapshot>` that stays valid for as long as they keep it, while a
//! rebuild produces a brand-new snapshot and swaps it in. At most one
//! rebuild runs at a time, and a failed rebuild leaves the old snapshot
//! being served.

use crate::cache::FragmentCache;
use crate::config::{ConfigError, IndexConfig};
use crate::exclude::{self, ExclusionReport};
use crate::index::{self, ClassificationError};
use crate::metadata::{self, MetadataIssue};
use crate::scan::{self, ScanError, ScanSummary};
use crate::types::{GroupIndex, GroupMetadata, MetadataRecord, MetadataSchema};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Classification failed: {0}")]
    Classification(#[from] ClassificationError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Canonical root every relative path is resolved against.
    pub root: PathBuf,
    pub groups: GroupIndex,
    pub schema: MetadataSchema,
    pub metadata: GroupMetadata,
    pub excluded: ExclusionReport,
    pub summary: ScanSummary,
    pub issues: Vec<MetadataIssue>,
    /// SHA-256 over the ordered groups and their files. Two snapshots with
    /// the same fingerprint map every page number to the same content.
    pub fingerprint: String,
}

/// Everything needed to render one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageView<'a> {
    pub page: usize,
    pub page_count: usize,
    pub key: &'a str,
    pub images: Vec<&'a str>,
    pub fragments: Vec<&'a str>,
    pub metadata: Option<&'a MetadataRecord>,
}

/// A content fragment's path and text.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub path: String,
    pub content: Arc<str>,
}

impl Snapshot {
    pub fn page_count(&self) -> usize {
        self.groups.len()
    }

    /// Look up a 1-based page number.
    pub fn page(&self, page: usize) -> Option<PageView<'_>> {
        let group = self.groups.page(page)?;
        Some(PageView {
            page,
            page_count: self.page_count(),
            key: &group.key,
            images: group.images().map(|f| f.path.as_str()).collect(),
            fragments: group.fragments().map(|f| f.path.as_str()).collect(),
            metadata: self.metadata.get(&group.key),
        })
    }
}

impl PageView<'_> {
    /// Read the page's content fragments through `cache`.
    pub fn load_fragments(
        &self,
        root: &Path,
        cache: &mut FragmentCache,
    ) -> io::Result<Vec<Fragment>> {
        self.fragments
            .iter()
            .map(|relative| {
                Ok(Fragment {
                    path: relative.to_string(),
                    content: cache.get(&root.join(relative))?,
                })
            })
            .collect()
    }
}

/// Run the whole indexing pipeline over `root`.
pub fn build_snapshot(root: &Path, config: &IndexConfig) -> Result<Snapshot, BuildError> {
    config.validate()?;
    let root = scan::canonical_root(root)?;
    let table = config.suffix_table();
    let suffixes = table.suffixes();

    let (files, summary) = scan::scan(&root, &suffixes, &config.scan_options())?;

    let filtered = exclude::filter(files, &root, &config.exclude);
    for entry in filtered.excluded.entries() {
        info!(
            keyword = %entry.keyword,
            count = entry.paths.len(),
            "Skipped paths containing excluded keyword"
        );
    }

    let typed = index::classify(&filtered.kept, &table)?;
    let groups = index::index(typed);
    let aggregate = metadata::aggregate(&groups, metadata::json_file_loader(&root));
    let fingerprint = fingerprint(&groups);

    info!(
        pages = groups.len(),
        fingerprint = %&fingerprint[..12],
        "Index built"
    );

    Ok(Snapshot {
        root,
        groups,
        schema: aggregate.schema,
        metadata: aggregate.metadata,
        excluded: filtered.excluded,
        summary,
        issues: aggregate.issues,
        fingerprint,
    })
}

/// SHA-256 of the page sequence, returned as a hex string.
pub fn fingerprint(groups: &GroupIndex) -> String {
    let mut hasher = Sha256::new();
    for group in groups {
        hasher.update(group.key.as_bytes());
        hasher.update(b"\0");
        for file in &group.files {
            hasher.update(file.kind.as_str());
            hasher.update(b":");
            hasher.update(file.path.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Holds the current snapshot and serializes rebuilds.
#[derive(Debug)]
pub struct SnapshotStore {
    root: PathBuf,
    config: IndexConfig,
    current: RwLock<Arc<Snapshot>>,
    build_lock: Mutex<()>,
}

impl SnapshotStore {
    /// Build the first snapshot. Fails if that build fails.
    pub fn open(root: &Path, config: IndexConfig) -> Result<Self, BuildError> {
        let snapshot = build_snapshot(root, &config)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            current: RwLock::new(Arc::new(snapshot)),
            build_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn current(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Rebuild from the filesystem and publish the result.
    ///
    /// Concurrent callers queue behind the one in flight. On error the
    /// previous snapshot stays current.
    pub fn rebuild(&self) -> Result<Arc<Snapshot>, BuildError> {
        let _building = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = Arc::new(build_snapshot(&self.root, &self.config)?);

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.fingerprint != snapshot.fingerprint {
            info!(
                previous = %&current.fingerprint[..12],
                next = %&snapshot.fingerprint[..12],
                "Page mapping changed"
            );
        }
        *current = Arc::clone(&snapshot);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use crate::types::FileKind;
    use serde_json::json;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn scenario_two_groups_with_metadata() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "g1/photo.png", "fake image");
        write_file(tmp.path(), "g1/reviewer2_metadata.json", r#"{"label":"cat"}"#);
        write_file(tmp.path(), "g2/photo2.jpg", "fake image");

        let snapshot = build_snapshot(tmp.path(), &IndexConfig::default()).unwrap();

        assert_eq!(group_keys(&snapshot), vec!["g1", "g2"]);
        assert_eq!(
            group_files(&snapshot, "g1"),
            vec![
                (FileKind::Image, "g1/photo.png"),
                (FileKind::MetadataRecord, "g1/reviewer2_metadata.json"),
            ]
        );
        assert_eq!(
            group_files(&snapshot, "g2"),
            vec![(FileKind::Image, "g2/photo2.jpg")]
        );
        assert_eq!(snapshot.schema.keys(), ["label"]);
        assert_eq!(snapshot.metadata.len(), 1);
        assert_eq!(snapshot.metadata.get("g1").unwrap()["label"], json!("cat"));
    }

    #[test]
    fn empty_root_builds_empty_snapshot() {
        let tmp = TempDir::new().unwrap();
        let snapshot = build_snapshot(tmp.path(), &IndexConfig::default()).unwrap();
        assert_eq!(snapshot.page_count(), 0);
        assert!(snapshot.page(1).is_none());
        assert!(snapshot.schema.is_empty());
    }

    #[test]
    fn missing_root_fails_build() {
        let tmp = TempDir::new().unwrap();
        let result = build_snapshot(&tmp.path().join("missing"), &IndexConfig::default());
        assert!(matches!(
            result,
            Err(BuildError::Scan(ScanError::RootMissing(_)))
        ));
    }

    #[test]
    fn invalid_config_fails_build() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "g/a.png", "x");
        let config = IndexConfig {
            exclude: vec![String::new()],
            ..Default::default()
        };
        let result = build_snapshot(tmp.path(), &config);
        assert!(matches!(result, Err(BuildError::Config(_))));
    }

    #[test]
    fn excluded_files_do_not_form_groups() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "keep/a.png", "x");
        write_file(tmp.path(), "skip-me/a.png", "x");
        let config = IndexConfig {
            exclude: vec!["skip".into()],
            ..Default::default()
        };

        let snapshot = build_snapshot(tmp.path(), &config).unwrap();
        assert_eq!(group_keys(&snapshot), vec!["keep"]);
        assert_eq!(
            snapshot.excluded.paths_for("skip").unwrap(),
            ["skip-me/a.png"]
        );
    }

    #[test]
    fn page_view_splits_files_by_kind() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "g/a.png", "x");
        write_file(tmp.path(), "g/reviewer2_content.html", "<p>hi</p>");
        write_file(tmp.path(), "g/b.svg", "<svg/>");

        let snapshot = build_snapshot(tmp.path(), &IndexConfig::default()).unwrap();
        let view = snapshot.page(1).unwrap();
        assert_eq!(view.key, "g");
        assert_eq!(view.page_count, 1);
        assert_eq!(view.images, vec!["g/a.png", "g/b.svg"]);
        assert_eq!(view.fragments, vec!["g/reviewer2_content.html"]);
        assert!(view.metadata.is_none());

        let mut cache = FragmentCache::new(false);
        let fragments = view.load_fragments(&snapshot.root, &mut cache).unwrap();
        assert_eq!(&*fragments[0].content, "<p>hi</p>");
    }

    #[test]
    fn fingerprint_tracks_page_mapping() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a/1.png", "x");
        let first = build_snapshot(tmp.path(), &IndexConfig::default()).unwrap();
        let again = build_snapshot(tmp.path(), &IndexConfig::default()).unwrap();
        assert_eq!(first.fingerprint, again.fingerprint);

        write_file(tmp.path(), "0/1.png", "x");
        let shifted = build_snapshot(tmp.path(), &IndexConfig::default()).unwrap();
        assert_ne!(first.fingerprint, shifted.fingerprint);
    }

    #[test]
    fn fingerprint_ignores_file_contents() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a/1.png", "x");
        let before = build_snapshot(tmp.path(), &IndexConfig::default()).unwrap();
        write_file(tmp.path(), "a/1.png", "changed");
        let after = build_snapshot(tmp.path(), &IndexConfig::default()).unwrap();
        assert_eq!(before.fingerprint, after.fingerprint);
    }

    #[test]
    fn store_rebuild_swaps_snapshot() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a/1.png", "x");
        let store = SnapshotStore::open(tmp.path(), IndexConfig::default()).unwrap();
        let old = store.current();
        assert_eq!(old.page_count(), 1);

        write_file(tmp.path(), "b/1.png", "x");
        let new = store.rebuild().unwrap();
        assert_eq!(new.page_count(), 2);
        assert_eq!(store.current().page_count(), 2);
        // Readers holding the old snapshot keep a consistent view.
        assert_eq!(old.page_count(), 1);
    }

    #[test]
    fn store_keeps_old_snapshot_on_failed_rebuild() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("reviews");
        write_file(&root, "a/1.png", "x");
        let store = SnapshotStore::open(&root, IndexConfig::default()).unwrap();

        fs::remove_dir_all(&root).unwrap();
        assert!(store.rebuild().is_err());
        assert_eq!(store.current().page_count(), 1);
    }

    #[test]
    fn rebuild_waits_for_build_in_flight() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a/1.png", "x");
        let store = SnapshotStore::open(tmp.path(), IndexConfig::default()).unwrap();
        let finished = AtomicBool::new(false);

        std::thread::scope(|s| {
            let held = store.build_lock.lock().unwrap();
            let waiter = s.spawn(|| {
                store.rebuild().unwrap();
                finished.store(true, Ordering::SeqCst);
            });
            std::thread::sleep(Duration::from_millis(200));
            let finished_while_held = finished.load(Ordering::SeqCst);

            write_file(tmp.path(), "b/1.png", "x");
            drop(held);
            waiter.join().unwrap();
            assert!(!finished_while_held);
        });
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(store.current().page_count(), 2);
    }
}

//! Shared test utilities for the review-index test suite.
//!
//! Provides fixture setup and lookup helpers that work with the snapshot
//! produced by [`build_snapshot`](crate::snapshot::build_snapshot).
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let snapshot = build_snapshot(tmp.path(), &IndexConfig::default()).unwrap();
//!
//! assert_eq!(group_keys(&snapshot)[0], "loose.png");
//! let group = find_group(&snapshot, "sample-001");
//! assert_eq!(group.files.len(), 4);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::snapshot::Snapshot;
use crate::types::{FileKind, Group};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/reviews/` to a temp directory and return it.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/reviews");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

// =========================================================================
// Snapshot lookups (panic with the available keys on a miss)
// =========================================================================

/// Find a group by key. Panics if not found.
pub fn find_group<'a>(snapshot: &'a Snapshot, key: &str) -> &'a Group {
    snapshot
        .groups
        .iter()
        .find(|g| g.key == key)
        .unwrap_or_else(|| {
            let keys = group_keys(snapshot);
            panic!("group '{key}' not found. Available: {keys:?}")
        })
}

/// All group keys in page order.
pub fn group_keys(snapshot: &Snapshot) -> Vec<&str> {
    snapshot.groups.keys().collect()
}

/// `(kind, path)` pairs of a group in file order. Panics if not found.
pub fn group_files<'a>(snapshot: &'a Snapshot, key: &str) -> Vec<(FileKind, &'a str)> {
    find_group(snapshot, key)
        .files
        .iter()
        .map(|f| (f.kind, f.path.as_str()))
        .collect()
}

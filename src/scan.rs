//! Filesystem scanning.
//!
//! Stage 1 of the indexing pipeline. Walks the review root for files whose
//! name ends with one of the recognized suffixes:
//!
//! ```text
//! reviews/                             # Root
//! ├── review-index.toml                # Config (optional, never matched)
//! ├── loose.png                        # Singleton page
//! ├── sample-001/                      # One page per directory
//! │   ├── photo.png                    # Image
//! │   ├── reviewer2_content.html       # Content fragment
//! │   └── reviewer2_metadata.json      # Metadata record
//! └── .cache/                          # Hidden, skipped
//! ```
//!
//! ## Matching
//!
//! Every suffix becomes the glob `**/*{suffix}`, matched against the path
//! relative to the root. A suffix may therefore carry its own wildcards
//! (`thumbs/*.png` only matches PNGs directly inside a `thumbs` directory).
//! A file matching several suffixes is recorded once, under the first one in
//! the caller's order, and a warning is logged.
//!
//! ## Canonical paths
//!
//! Symlinks are followed and every match is canonicalized, so the same
//! physical file reached through two spellings is only counted once. Matches
//! that resolve outside the root are dropped. The result is sorted by path,
//! which keeps later stages independent of directory iteration order.

use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Root directory not found: {0}")]
    RootMissing(PathBuf),
    #[error("Root is not a directory: {0}")]
    RootNotDirectory(PathBuf),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to read root directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid suffix pattern '{suffix}': {source}")]
    Pattern {
        suffix: String,
        #[source]
        source: glob::PatternError,
    },
}

/// A matched file: canonical absolute path plus the suffix it matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawFile {
    pub path: PathBuf,
    pub suffix: String,
}

impl RawFile {
    /// `/`-separated path relative to `root`, or `None` if the file lies outside it.
    pub fn relative_to(&self, root: &Path) -> Option<String> {
        self.path.strip_prefix(root).ok().map(relative_string)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Descend into and match entries whose name starts with `.`.
    pub include_hidden: bool,
}

/// Number of matched files per suffix, in suffix order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub counts: Vec<SuffixCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuffixCount {
    pub suffix: String,
    pub count: usize,
}

impl ScanSummary {
    pub fn from_files(suffixes: &[String], files: &[RawFile]) -> Self {
        let counts = suffixes
            .iter()
            .map(|suffix| SuffixCount {
                suffix: suffix.clone(),
                count: files.iter().filter(|f| &f.suffix == suffix).count(),
            })
            .collect();
        Self { counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|c| c.count).sum()
    }

    /// Only the suffixes that matched something.
    pub fn found(&self) -> impl Iterator<Item = &SuffixCount> {
        self.counts.iter().filter(|c| c.count > 0)
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Resolve the root to a canonical directory path.
pub fn canonical_root(root: &Path) -> Result<PathBuf, ScanError> {
    if !root.exists() {
        return Err(ScanError::RootMissing(root.to_path_buf()));
    }
    let canonical = fs::canonicalize(root).map_err(|source| ScanError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    if !canonical.is_dir() {
        return Err(ScanError::RootNotDirectory(root.to_path_buf()));
    }
    Ok(canonical)
}

/// Scan `root` for files ending in one of `suffixes`, with per-suffix counts.
///
/// Zero matches is not an error. Unreadable subdirectories are logged and
/// skipped; only an unreadable root fails the scan.
pub fn scan(
    root: &Path,
    suffixes: &[String],
    options: &ScanOptions,
) -> Result<(Vec<RawFile>, ScanSummary), ScanError> {
    let root = canonical_root(root)?;
    let patterns = compile_patterns(suffixes)?;

    info!(
        root = %root.display(),
        suffixes = %suffixes.join(", "),
        "Looking for review files"
    );

    let mut candidates = Vec::new();
    let walker = WalkDir::new(&root)
        .follow_links(true)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| options.include_hidden || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(ScanError::Walk(err)),
            Err(err) => {
                warn!(error = %err, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(&root)
            && match_suffix(&patterns, &relative_string(relative)).is_some()
        {
            candidates.push(entry.into_path());
        }
    }

    // The suffix is detected on the canonical path: a symlink named like an
    // image that points at something else is not an image.
    let resolved: Vec<Option<RawFile>> = candidates
        .into_par_iter()
        .map(|path| resolve(&root, &patterns, options, path))
        .collect();

    let mut files: Vec<RawFile> = resolved.into_iter().flatten().collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    let before = files.len();
    files.dedup_by(|a, b| a.path == b.path);
    if files.len() < before {
        debug!(
            duplicates = before - files.len(),
            "Dropped files reached through more than one path"
        );
    }

    let summary = ScanSummary::from_files(suffixes, &files);
    let counts = summary
        .found()
        .map(|c| format!("{} {}", c.count, c.suffix))
        .collect::<Vec<_>>()
        .join(", ");
    info!(total = summary.total(), counts = %counts, "Scan complete");

    Ok((files, summary))
}

fn resolve(
    root: &Path,
    patterns: &[(String, Pattern)],
    options: &ScanOptions,
    path: PathBuf,
) -> Option<RawFile> {
    let canonical = match fs::canonicalize(&path) {
        Ok(p) => p,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Unable to resolve path, skipping");
            return None;
        }
    };
    let Ok(relative) = canonical.strip_prefix(root) else {
        warn!(
            path = %path.display(),
            target = %canonical.display(),
            "Link resolves outside the root, skipping"
        );
        return None;
    };
    if !options.include_hidden && has_hidden_component(relative) {
        warn!(
            path = %path.display(),
            target = %canonical.display(),
            "Link resolves into a hidden entry, skipping"
        );
        return None;
    }
    let relative = relative_string(relative);
    let matched: Vec<&str> = patterns
        .iter()
        .filter(|(_, p)| p.matches_with(&relative, MATCH_OPTIONS))
        .map(|(s, _)| s.as_str())
        .collect();
    let Some(suffix) = matched.first() else {
        warn!(
            path = %path.display(),
            target = %canonical.display(),
            "Link target matches no suffix, skipping"
        );
        return None;
    };
    if matched.len() > 1 {
        warn!(
            path = %relative,
            suffixes = %matched.join(", "),
            chosen = %suffix,
            "File matches several suffixes; recording it once under the first"
        );
    }
    Some(RawFile {
        suffix: suffix.to_string(),
        path: canonical,
    })
}

fn compile_patterns(suffixes: &[String]) -> Result<Vec<(String, Pattern)>, ScanError> {
    suffixes
        .iter()
        .map(|suffix| {
            Pattern::new(&format!("**/*{suffix}"))
                .map(|p| (suffix.clone(), p))
                .map_err(|source| ScanError::Pattern {
                    suffix: suffix.clone(),
                    source,
                })
        })
        .collect()
}

fn match_suffix<'a>(patterns: &'a [(String, Pattern)], relative: &str) -> Option<&'a str> {
    patterns
        .iter()
        .find(|(_, p)| p.matches_with(relative, MATCH_OPTIONS))
        .map(|(s, _)| s.as_str())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn has_hidden_component(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| matches!(c, Component::Normal(part) if part.to_string_lossy().starts_with('.')))
}

/// Join the normal components of a relative path with `/`.
pub fn relative_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

//! Keyword-based exclusion.
//!
//! A file is dropped when any configured keyword occurs as a substring of
//! its root-relative path. When several keywords match, the one declared
//! first claims the file, so the report attributes each exclusion exactly
//! once and independently of any map iteration order.

use crate::scan::RawFile;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// A file that survived exclusion, with its root-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeptFile {
    pub file: RawFile,
    pub relative: String,
}

/// Paths excluded by one keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordExclusions {
    pub keyword: String,
    pub paths: Vec<String>,
}

/// Which keyword excluded which files, in declared keyword order.
///
/// Keywords that excluded nothing are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExclusionReport {
    entries: Vec<KeywordExclusions>,
}

impl ExclusionReport {
    pub fn entries(&self) -> &[KeywordExclusions] {
        &self.entries
    }

    pub fn paths_for(&self, keyword: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.keyword == keyword)
            .map(|e| e.paths.as_slice())
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.paths.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filtered {
    pub kept: Vec<KeptFile>,
    pub excluded: ExclusionReport,
}

/// Split `files` into kept and excluded, keeping scan order for both.
pub fn filter(files: Vec<RawFile>, root: &Path, keywords: &[String]) -> Filtered {
    let mut claimed: Vec<Vec<String>> = vec![Vec::new(); keywords.len()];
    let mut kept = Vec::with_capacity(files.len());

    for file in files {
        let relative = file
            .relative_to(root)
            .unwrap_or_else(|| file.path.to_string_lossy().into_owned());

        match keywords.iter().position(|k| relative.contains(k.as_str())) {
            Some(i) => {
                debug!(path = %relative, keyword = %keywords[i], "Excluded by keyword");
                claimed[i].push(relative);
            }
            None => {
                debug!(path = %relative, suffix = %file.suffix, "Matched file");
                kept.push(KeptFile { file, relative });
            }
        }
    }

    let entries = keywords
        .iter()
        .zip(claimed)
        .filter(|(_, paths)| !paths.is_empty())
        .map(|(keyword, paths)| KeywordExclusions {
            keyword: keyword.clone(),
            paths,
        })
        .collect();

    Filtered {
        kept,
        excluded: ExclusionReport { entries },
    }
}

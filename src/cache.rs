//! Content fragment cache for page views.
//!
//! Every page view reads the group's `reviewer2_content.html` fragments from
//! disk. This module keeps their text in memory between views, as an explicit
//! object owned by whoever serves pages rather than process-wide state.
//!
//! # Invalidation
//!
//! An entry is reused only while the file's modification time matches the
//! one recorded when it was read. Editing a fragment therefore shows up on
//! the next view without restarting anything.
//!
//! With `dev_mode` enabled every lookup goes to disk, which matches what a
//! reviewer editing fragments by hand expects even on filesystems with coarse
//! timestamps.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct CachedFragment {
    modified: SystemTime,
    content: Arc<str>,
}

#[derive(Debug, Default)]
pub struct FragmentCache {
    dev_mode: bool,
    entries: HashMap<PathBuf, CachedFragment>,
    stats: CacheStats,
}

impl FragmentCache {
    pub fn new(dev_mode: bool) -> Self {
        Self {
            dev_mode,
            ..Self::default()
        }
    }

    /// Return the text of the fragment at `path`, reading it if the cached
    /// copy is missing or stale.
    pub fn get(&mut self, path: &Path) -> io::Result<Arc<str>> {
        let modified = std::fs::metadata(path)?.modified()?;

        if !self.dev_mode
            && let Some(entry) = self.entries.get(path)
            && entry.modified == modified
        {
            self.stats.hit();
            return Ok(Arc::clone(&entry.content));
        }

        self.stats.miss();
        let content: Arc<str> = std::fs::read_to_string(path)?.into();
        if !self.dev_mode {
            self.entries.insert(
                path.to_path_buf(),
                CachedFragment {
                    modified,
                    content: Arc::clone(&content),
                },
            );
        }
        Ok(content)
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

/// Hit/miss counters for a cache's lifetime.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} read ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} read", self.misses)
        }
    }
}

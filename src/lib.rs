//! # review-index
//!
//! Indexes a directory of review artifacts into a stable, paginated list of
//! review items. Your filesystem is the data source: directories become
//! pages, loose files at the root become single-file pages, and two
//! structural files carry the page's extra content.
//!
//! ```text
//! reviews/
//! ├── loose.png                        → page "loose.png"
//! ├── sample-001/                      → page "sample-001"
//! │   ├── photo.png                    image
//! │   ├── reviewer2_content.html       content fragment (shown as-is)
//! │   └── reviewer2_metadata.json      metadata record (JSON object)
//! └── sample-002/                      → page "sample-002"
//!     └── a.webp
//! ```
//!
//! # Architecture: One Pass, One Snapshot
//!
//! ```text
//! 1. Scan       root       →  canonical files       (suffix matching)
//! 2. Exclude    files      →  kept + report         (keyword substrings)
//! 3. Index      kept       →  sorted groups         (page order)
//! 4. Aggregate  groups     →  schema + metadata     (soft-fail per file)
//! ```
//!
//! The stages run sequentially and produce an immutable [`snapshot::Snapshot`].
//! A re-index builds a new snapshot from scratch; there are no incremental
//! updates. Page `i` is always group `i - 1` of the sorted group list, so the
//! mapping is stable for as long as the set of files is.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the root, matches suffixes, canonicalizes paths |
//! | [`exclude`] | Drops files by keyword, first declared keyword claims the file |
//! | [`index`] | Suffix → kind classification and grouping into pages |
//! | [`metadata`] | Merges per-group JSON metadata and accumulates the column schema |
//! | [`snapshot`] | Runs the pipeline; snapshot store with atomic swaps |
//! | [`url`] | Page references and page request resolution |
//! | [`cache`] | Invalidate-on-change cache for content fragments |
//! | [`config`] | `review-index.toml` loading, layering, and validation |
//! | [`types`] | Shared types handed to the serving layer |
//! | [`output`] | CLI report formatting |

pub mod cache;
pub mod config;
pub mod exclude;
pub mod index;
pub mod metadata;
pub mod output;
pub mod scan;
pub mod snapshot;
pub mod types;
pub mod url;

#[cfg(test)]
pub(crate) mod test_helpers;

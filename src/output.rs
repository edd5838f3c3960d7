//! CLI output formatting.
//!
//! # Information-First Display
//!
//! The report leads with pages: positional index and group key, followed by
//! indented context lines for the files and metadata behind each page. This
//! reads as an inventory of what a reviewer will see, page by page.
//!
//! # Output Format
//!
//! ```text
//! Found 4 png, 1 jpg and 1 reviewer2_metadata.json files in 3 groups
//!
//! Pages
//! 001 loose.png (1 image)
//! 002 sample-001 (2 images, 1 fragment)
//!     label: "cat"
//!     score: 3
//! 003 sample-002 (1 image)
//!
//! Excluded
//!     drafts: 1 path
//!
//! Metadata
//!     Columns: label, score
//!     Skipped sample-003/reviewer2_metadata.json: Unable to parse ...
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stderr, leaving stdout
//! free for JSON. Format functions do no I/O.

use crate::scan::ScanSummary;
use crate::snapshot::{PageView, Snapshot};
use crate::types::MetadataRecord;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 image`, `2 images`.
fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Page header: positional index + key, with file counts.
///
/// ```text
/// 002 sample-001 (2 images, 1 fragment)
/// ```
fn page_header(index: usize, key: &str, images: usize, fragments: usize) -> String {
    let mut counts = vec![plural(images, "image")];
    if fragments > 0 {
        counts.push(plural(fragments, "fragment"));
    }
    format!("{} {} ({})", format_index(index), key, counts.join(", "))
}

fn metadata_lines(record: &MetadataRecord, depth: usize) -> Vec<String> {
    record
        .iter()
        .map(|(key, value)| {
            format!("{}{}: {}", indent(depth), key, truncate_desc(&value.to_string(), 60))
        })
        .collect()
}

/// `Found 2 png and 1 jpg files in 2 groups`
pub fn format_summary(summary: &ScanSummary, groups: usize) -> String {
    let found: Vec<String> = summary
        .found()
        .map(|c| format!("{} {}", c.count, c.suffix))
        .collect();
    let files = match found.split_last() {
        None => "no matching files".to_string(),
        Some((last, [])) => format!("{last} files"),
        Some((last, rest)) => format!("{} and {last} files", rest.join(", ")),
    };
    if groups > 1 {
        format!("Found {files} in {groups} groups")
    } else {
        format!("Found {files}")
    }
}

// ============================================================================
// Index report
// ============================================================================

/// Format the report for a freshly built snapshot.
pub fn format_index_output(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = vec![format_summary(&snapshot.summary, snapshot.page_count())];

    if !snapshot.groups.is_empty() {
        lines.push(String::new());
        lines.push("Pages".to_string());
        for (i, group) in snapshot.groups.iter().enumerate() {
            lines.push(page_header(
                i + 1,
                &group.key,
                group.images().count(),
                group.fragments().count(),
            ));
            if let Some(record) = snapshot.metadata.get(&group.key) {
                lines.extend(metadata_lines(record, 1));
            }
        }
    }

    if !snapshot.excluded.is_empty() {
        lines.push(String::new());
        lines.push("Excluded".to_string());
        for entry in snapshot.excluded.entries() {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                entry.keyword,
                plural(entry.paths.len(), "path")
            ));
        }
    }

    if !snapshot.schema.is_empty() || !snapshot.issues.is_empty() {
        lines.push(String::new());
        lines.push("Metadata".to_string());
        if !snapshot.schema.is_empty() {
            lines.push(format!(
                "{}Columns: {}",
                indent(1),
                snapshot.schema.keys().join(", ")
            ));
        }
        for issue in &snapshot.issues {
            lines.push(format!(
                "{}Skipped {}: {}",
                indent(1),
                issue.path,
                issue.message
            ));
        }
    }

    lines
}

/// Print the index report to stderr.
pub fn print_index_output(snapshot: &Snapshot) {
    for line in format_index_output(snapshot) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Single page
// ============================================================================

/// Format one page the way a reviewer would scan it.
///
/// ```text
/// Page 2 of 6: sample-001
///     Image: sample-001/photo.png
///     Fragment: sample-001/reviewer2_content.html
///     label: "cat"
/// ```
pub fn format_page_output(view: &PageView<'_>) -> Vec<String> {
    let mut lines = vec![format!(
        "Page {} of {}: {}",
        view.page, view.page_count, view.key
    )];
    for image in &view.images {
        lines.push(format!("{}Image: {}", indent(1), image));
    }
    for fragment in &view.fragments {
        lines.push(format!("{}Fragment: {}", indent(1), fragment));
    }
    if let Some(record) = view.metadata {
        lines.extend(metadata_lines(record, 1));
    }
    lines
}

/// Print a page summary to stderr.
pub fn print_page_output(view: &PageView<'_>) {
    for line in format_page_output(view) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

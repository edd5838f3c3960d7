//! Page references.
//!
//! A page reference carries the page to show and the page the viewer came
//! from, rendered as `/page?last={last}&i={page}`. Building one never fails;
//! range checks belong to whoever serves the page.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageRef {
    pub page: i64,
    pub last: i64,
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/page?last={}&i={}", self.last, self.page)
    }
}

pub fn page_url(page: i64, last: i64) -> PageRef {
    PageRef { page, last }
}

/// A page request after defaulting and range clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    /// Always within `1..=page_count`, or 1 when there are no pages.
    pub page: usize,
    pub last: i64,
}

/// Interpret raw `i` and `last` request values.
///
/// A missing or non-numeric `i` means page 1. A missing or non-numeric
/// `last` defaults to the requested `i`, taken before clamping. An `i`
/// outside `1..=page_count` falls back to page 1.
pub fn resolve_page_request(i: Option<&str>, last: Option<&str>, page_count: usize) -> PageRequest {
    let requested = i.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(1);
    let last = last
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(requested);

    let page = usize::try_from(requested)
        .ok()
        .filter(|p| (1..=page_count).contains(p))
        .unwrap_or(1);

    PageRequest { page, last }
}

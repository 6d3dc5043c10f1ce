//! Merging pages into the accumulated result list, and the read-side sort.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::client::query::SortKey;
use crate::models::{JobListing, SearchResultPage};

/// Paging metadata of the most recent page. Never accumulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub total_results: u64,
    pub has_more: bool,
    pub strategy_level: Option<u8>,
}

impl From<&SearchResultPage> for PageMeta {
    fn from(page: &SearchResultPage) -> Self {
        Self {
            total_results: page.total_results,
            has_more: page.has_more,
            strategy_level: page.strategy_level,
        }
    }
}

/// Replace (`append == false`) or extend without duplicate ids (`append == true`).
///
/// In append mode `existing` keeps its order and is followed by the items of
/// `incoming` whose id is not yet present, in `incoming`'s order. In both
/// modes an id that repeats inside `incoming` itself is kept once.
pub fn merge(existing: &[JobListing], incoming: Vec<JobListing>, append: bool) -> Vec<JobListing> {
    let base: &[JobListing] = if append { existing } else { &[] };

    let mut seen: HashSet<String> = base.iter().map(|job| job.id.clone()).collect();
    let mut merged = Vec::with_capacity(base.len() + incoming.len());
    merged.extend_from_slice(base);
    merged.extend(incoming.into_iter().filter(|job| seen.insert(job.id.clone())));
    merged
}

/// Merges `page` into `items` in place and returns the page's metadata.
pub fn absorb(items: &mut Vec<JobListing>, page: SearchResultPage, append: bool) -> PageMeta {
    let meta = PageMeta::from(&page);
    *items = merge(items, page.items, append);
    meta
}

/// Display order for the accumulated list. Returns a sorted copy; stored
/// order is untouched and `relevance` keeps the backend's order.
pub fn sorted_for_display(items: &[JobListing], sort: SortKey) -> Vec<JobListing> {
    let mut view = items.to_vec();
    match sort {
        SortKey::Relevance => {}
        SortKey::Newest => view.sort_by(|a, b| posted_millis(b).cmp(&posted_millis(a))),
        SortKey::Salary => view.sort_by(|a, b| descending(a.salary_ceiling(), b.salary_ceiling())),
        SortKey::Match => view.sort_by(|a, b| {
            descending(a.match_score.unwrap_or(0.0), b.match_score.unwrap_or(0.0))
        }),
    }
    view
}

fn posted_millis(job: &JobListing) -> i64 {
    job.posted_date.map(|d| d.timestamp_millis()).unwrap_or(0)
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

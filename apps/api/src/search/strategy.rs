//! Progressive filter relaxation for searches that come back empty.
//!
//! Level 0 is the query as given. Each level drops one more filter:
//! 1 salary bounds, 2 contract type, 3 location.

use tracing::info;

use crate::search::board::{BoardPage, JobBoard, UpstreamError};
use crate::search::query::SearchQuery;

pub const MAX_STRATEGY_LEVEL: u8 = 3;

impl SearchQuery {
    /// The query with filters dropped according to `level`.
    pub fn relaxed(&self, level: u8) -> SearchQuery {
        let mut query = self.clone();
        if level >= 1 {
            query.salary_min = None;
            query.salary_max = None;
        }
        if level >= 2 {
            query.contract_type = None;
        }
        if level >= 3 {
            query.location = None;
        }
        query
    }
}

/// Tries each level in turn until one yields results. Levels that would not
/// change the query are skipped. Returns the page with the level that
/// produced it; an empty page at the last distinct level is still a result.
pub async fn search_with_relaxation(
    board: &dyn JobBoard,
    query: &SearchQuery,
) -> Result<(BoardPage, u8), UpstreamError> {
    let mut last: Option<(SearchQuery, BoardPage, u8)> = None;

    for level in 0..=MAX_STRATEGY_LEVEL {
        let candidate = query.relaxed(level);
        if matches!(&last, Some((previous, _, _)) if *previous == candidate) {
            continue;
        }

        let page = board.search(&candidate).await?;
        if !page.listings.is_empty() {
            if level > 0 {
                info!(level, "Relaxed search filters to find results");
            }
            return Ok((page, level));
        }
        last = Some((candidate, page, level));
    }

    // The loop always runs level 0, so `last` is set here.
    Ok(last
        .map(|(_, page, level)| (page, level))
        .unwrap_or_default())
}

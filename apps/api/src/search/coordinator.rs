//! Decides how a search request is answered: from cache, synchronously, or
//! with a processing signal while the upstream fetch continues in the
//! background and fills the cache for the client's next poll.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::models::{JobListing, ProcessingBody, SearchMetadata, SearchResponseBody};
use crate::search::board::{JobBoard, UpstreamError};
use crate::search::cache::{get_json, put_json, SearchCache};
use crate::search::query::SearchQuery;
use crate::search::strategy::search_with_relaxation;

pub const STARTED_MESSAGE: &str = "Search started, fetching jobs from the job board";
pub const IN_PROGRESS_MESSAGE: &str = "Still searching the job board";

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// How long a request waits for a fresh upstream fetch before answering 202.
    pub sync_wait: Duration,
    pub cache_ttl: Duration,
    /// Failures are remembered just long enough for the next poll to see them.
    pub failure_ttl: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            sync_wait: Duration::from_millis(4000),
            cache_ttl: Duration::from_secs(900),
            failure_ttl: Duration::from_secs(30),
        }
    }
}

/// What the cache holds for one page key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachedSearch {
    Page {
        listings: Vec<JobListing>,
        total_results: u64,
        has_more: bool,
        strategy_level: u8,
    },
    Failed {
        rate_limited: bool,
        message: String,
    },
}

impl CachedSearch {
    fn into_outcome(self, cached: bool) -> Result<SearchOutcome, AppError> {
        match self {
            CachedSearch::Page {
                listings,
                total_results,
                has_more,
                strategy_level,
            } => Ok(SearchOutcome::Ready(SearchResponseBody {
                data: listings,
                metadata: SearchMetadata {
                    total_results,
                    has_more,
                    api_strategy: (strategy_level > 0).then_some(strategy_level),
                    cached: Some(cached),
                },
            })),
            CachedSearch::Failed {
                rate_limited: true,
                message,
            } => Err(AppError::RateLimited(message)),
            CachedSearch::Failed { message, .. } => Err(AppError::Upstream(message)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Ready(SearchResponseBody),
    Pending(ProcessingBody),
}

pub struct SearchCoordinator {
    board: Arc<dyn JobBoard>,
    cache: Arc<dyn SearchCache>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    settings: CoordinatorSettings,
}

impl SearchCoordinator {
    pub fn new(
        board: Arc<dyn JobBoard>,
        cache: Arc<dyn SearchCache>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            board,
            cache,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            settings,
        }
    }

    pub async fn lookup(&self, query: SearchQuery) -> Result<SearchOutcome, AppError> {
        let key = query.cache_key();

        if let Some(entry) = get_json::<CachedSearch>(self.cache.as_ref(), &key).await {
            debug!(key, "Search served from cache");
            return entry.into_outcome(true);
        }

        let Some(guard) = InFlightGuard::claim(&self.in_flight, &key) else {
            debug!(key, "Search already in flight");
            return Ok(SearchOutcome::Pending(ProcessingBody {
                message: IN_PROGRESS_MESSAGE.to_string(),
                search_in_progress: Some(true),
            }));
        };

        info!(key, "Starting upstream search");
        let board = self.board.clone();
        let cache = self.cache.clone();
        let settings = self.settings.clone();
        let mut task = tokio::spawn(async move {
            let entry = fetch(board.as_ref(), cache.as_ref(), &query, &settings).await;
            let ttl = match entry {
                CachedSearch::Page { .. } => settings.cache_ttl,
                CachedSearch::Failed { .. } => settings.failure_ttl,
            };
            put_json(cache.as_ref(), &query.cache_key(), &entry, ttl).await;
            drop(guard);
            entry
        });

        match tokio::time::timeout(self.settings.sync_wait, &mut task).await {
            Ok(Ok(entry)) => entry.into_outcome(false),
            Ok(Err(join_err)) => Err(AppError::Internal(anyhow::anyhow!(
                "search task failed: {join_err}"
            ))),
            Err(_) => {
                info!(key, "Upstream search still running, answering 202");
                Ok(SearchOutcome::Pending(ProcessingBody {
                    message: STARTED_MESSAGE.to_string(),
                    search_in_progress: None,
                }))
            }
        }
    }
}

/// Runs the upstream search. Page 0 goes through filter relaxation and
/// remembers the winning level; later pages reuse it.
async fn fetch(
    board: &dyn JobBoard,
    cache: &dyn SearchCache,
    query: &SearchQuery,
    settings: &CoordinatorSettings,
) -> CachedSearch {
    let strategy_key = format!("strategy:{}", query.base_key());

    let result = if query.page == 0 {
        match search_with_relaxation(board, query).await {
            Ok((page, level)) => {
                put_json(cache, &strategy_key, &level, settings.cache_ttl).await;
                Ok((page, level))
            }
            Err(e) => Err(e),
        }
    } else {
        let level = get_json::<u8>(cache, &strategy_key).await.unwrap_or(0);
        board
            .search(&query.relaxed(level))
            .await
            .map(|page| (page, level))
    };

    match result {
        Ok((page, strategy_level)) => CachedSearch::Page {
            has_more: query.has_more(page.total_results),
            total_results: page.total_results,
            listings: page.listings,
            strategy_level,
        },
        Err(UpstreamError::RateLimited) => {
            warn!("Job board rate limited the search");
            CachedSearch::Failed {
                rate_limited: true,
                message: "The job board is receiving too many searches. Please try again shortly."
                    .to_string(),
            }
        }
        Err(e) => {
            warn!("Upstream search failed: {e}");
            CachedSearch::Failed {
                rate_limited: false,
                message: e.to_string(),
            }
        }
    }
}

/// Marks a cache key as being fetched; the mark is removed on drop.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightGuard {
    fn claim(set: &Arc<Mutex<HashSet<String>>>, key: &str) -> Option<Self> {
        let mut keys = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.insert(key.to_string()).then(|| Self {
            set: set.clone(),
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut keys = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.remove(&self.key);
    }
}

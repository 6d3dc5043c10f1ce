//! `JobSearchSession` owns the session state and runs the search pipeline.
//!
//! Every `search`/`load_more` bumps a generation counter stored inside the
//! state. Continuations write back only through [`JobSearchSession::apply`],
//! which compares generations under the same lock as the write, so a
//! superseded poll loop or enrichment can never touch newer state.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::aggregator::{absorb, sorted_for_display};
use crate::client::enricher::SalaryEnricher;
use crate::client::error::ClientError;
use crate::client::polling::{PollConfig, PollOutcome, PollState, PollingController, Sleeper, TokioSleeper};
use crate::client::query::{self, QueryParameters, SearchFilters};
use crate::client::transport::{HttpTransport, JobSearchApi, SalaryLookup, SearchReply};
use crate::client::ClientConfig;
use crate::models::{JobListing, SearchResultPage};

/// Read-only snapshot published to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub filters: SearchFilters,
    /// Unique ids, in page order.
    pub items: Vec<JobListing>,
    pub total_results: u64,
    pub has_more: bool,
    pub strategy_level: Option<u8>,
    pub last_error: Option<String>,
    pub poll_state: Option<PollState>,
    pub is_loading: bool,
    pub generation: u64,
}

impl SessionState {
    /// Accumulated items in the order selected by the current sort key.
    pub fn display(&self) -> Vec<JobListing> {
        sorted_for_display(&self.items, self.filters.sort_key)
    }
}

pub struct JobSearchSession {
    api: Arc<dyn JobSearchApi>,
    salary: Arc<dyn SalaryLookup>,
    sleeper: Arc<dyn Sleeper>,
    poll: PollConfig,
    page_size: u32,
    state: watch::Sender<SessionState>,
}

impl JobSearchSession {
    pub fn new(
        api: Arc<dyn JobSearchApi>,
        salary: Arc<dyn SalaryLookup>,
        sleeper: Arc<dyn Sleeper>,
        poll: PollConfig,
        page_size: u32,
    ) -> Self {
        let initial = SessionState {
            filters: SearchFilters {
                page_size,
                ..SearchFilters::default()
            },
            ..SessionState::default()
        };
        let (state, _) = watch::channel(initial);
        Self {
            api,
            salary,
            sleeper,
            poll,
            page_size,
            state,
        }
    }

    /// Session talking HTTP to the proxy server with real timers.
    pub fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Ok(Self::new(
            transport.clone(),
            transport,
            Arc::new(TokioSleeper),
            config.poll.clone(),
            config.page_size,
        ))
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Fresh search: page 0, replace semantics. Supersedes anything in flight.
    pub async fn search(&self, filters: SearchFilters) {
        let filters = SearchFilters {
            page: 0,
            page_size: self.page_size,
            ..filters
        };
        let generation = self.begin(|state| {
            state.filters = filters.clone();
            state.last_error = None;
            state.poll_state = None;
            state.is_loading = true;
        });
        info!(generation, what = %filters.free_text, "Starting job search");

        self.run(generation, filters, false).await;
    }

    /// Next page, append semantics. No-op without more results or while a
    /// load is already running.
    pub async fn load_more(&self) {
        let mut next = None;
        self.state.send_if_modified(|state| {
            if !state.has_more || state.is_loading {
                return false;
            }
            state.generation += 1;
            state.last_error = None;
            state.poll_state = None;
            state.is_loading = true;
            let page = state.filters.page.saturating_add(1);
            next = Some((state.generation, state.filters.clone().with_page(page)));
            true
        });

        let Some((generation, filters)) = next else {
            debug!("load_more ignored: nothing more to load or a load is in flight");
            return;
        };
        info!(generation, page = filters.page, "Loading more jobs");

        self.run(generation, filters, true).await;
    }

    /// Clears all state and invalidates in-flight work, e.g. when the view goes away.
    pub fn reset(&self) {
        let page_size = self.page_size;
        self.begin(|state| {
            *state = SessionState {
                filters: SearchFilters {
                    page_size,
                    ..SearchFilters::default()
                },
                generation: state.generation,
                ..SessionState::default()
            };
        });
    }

    async fn run(&self, generation: u64, filters: SearchFilters, append: bool) {
        let query = query::build(&filters);

        let page = match self.fetch_page(generation, &query).await {
            Ok(Some(page)) => page,
            Ok(None) => return,
            Err(err) => {
                self.fail(generation, err, append);
                return;
            }
        };

        if !self.is_current(generation) {
            debug!(generation, "Dropping superseded page before enrichment");
            return;
        }

        let SearchResultPage {
            items,
            total_results,
            has_more,
            strategy_level,
            cached,
        } = page;
        let items = SalaryEnricher::new(self.salary.as_ref())
            .enrich_page(items)
            .await;
        let page = SearchResultPage {
            items,
            total_results,
            has_more,
            strategy_level,
            cached,
        };

        let applied = self.apply(generation, |state| {
            let meta = absorb(&mut state.items, page, append);
            state.total_results = meta.total_results;
            state.has_more = meta.has_more;
            state.strategy_level = meta.strategy_level;
            state.filters.page = filters.page;
            state.is_loading = false;
        });
        if applied {
            info!(generation, total = total_results, has_more, cached, "Search results applied");
        }
    }

    /// One request, plus the polling loop when the backend answers "processing".
    /// `Ok(None)` means the operation was superseded while polling.
    async fn fetch_page(
        &self,
        generation: u64,
        query: &QueryParameters,
    ) -> Result<Option<SearchResultPage>, ClientError> {
        match self.api.search(query).await? {
            SearchReply::Ready(page) => Ok(Some(page)),
            SearchReply::Processing(notice) => {
                let controller =
                    PollingController::new(self.api.as_ref(), self.sleeper.as_ref(), &self.poll);
                let outcome = controller
                    .run(query, notice, |poll| {
                        self.apply(generation, |state| state.poll_state = Some(poll.clone()))
                    })
                    .await?;
                match outcome {
                    PollOutcome::Ready(page) => Ok(Some(page)),
                    PollOutcome::Superseded => Ok(None),
                }
            }
        }
    }

    fn fail(&self, generation: u64, err: ClientError, append: bool) {
        let message = err.to_string();
        let applied = self.apply(generation, |state| {
            state.last_error = Some(message);
            state.is_loading = false;
            // A failed fresh search leaves old items in place, but they no
            // longer belong to the current filters, so they cannot be paged.
            if !append {
                state.has_more = false;
            }
        });
        if applied {
            warn!(generation, "Job search failed: {err}");
        }
    }

    fn begin(&self, init: impl FnOnce(&mut SessionState)) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            generation = state.generation;
            init(state);
        });
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.borrow().generation == generation
    }

    /// Mutates state only if `generation` is still the current one.
    fn apply(&self, generation: u64, mutate: impl FnOnce(&mut SessionState)) -> bool {
        self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            mutate(state);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error::ClientError;
    use crate::client::polling::PollStatus;
    use crate::client::query::SortKey;
    use crate::client::testing::{
        extending, page_of, processing, FakeSalaryLookup, RecordingSleeper, ScriptedApi,
    };
    use crate::client::transport::SearchReply;
    use crate::models::SalaryEstimateRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Harness {
        api: Arc<ScriptedApi>,
        sleeper: Arc<RecordingSleeper>,
        session: JobSearchSession,
    }

    fn harness(script: Vec<Result<SearchReply, ClientError>>) -> Harness {
        let api = Arc::new(ScriptedApi::new(script));
        let sleeper = Arc::new(RecordingSleeper::default());
        let salary = Arc::new(FakeSalaryLookup::answering(Ok("$50k - $60k".to_string())));
        let session = JobSearchSession::new(
            api.clone(),
            salary,
            sleeper.clone(),
            PollConfig::default(),
            3,
        );
        Harness {
            api,
            sleeper,
            session,
        }
    }

    fn ids(state: &SessionState) -> Vec<&str> {
        state.items.iter().map(|j| j.id.as_str()).collect()
    }

    fn engineer() -> SearchFilters {
        SearchFilters::default().with_free_text("engineer")
    }

    #[tokio::test]
    async fn test_search_polls_through_processing_to_results() {
        let h = harness(vec![
            Ok(SearchReply::Processing(processing("Search started"))),
            Ok(SearchReply::Processing(extending("Still searching"))),
            Ok(SearchReply::Processing(extending("Still searching"))),
            Ok(SearchReply::Ready(page_of(&["a", "b", "c"], true))),
        ]);

        h.session.search(engineer()).await;

        let state = h.session.snapshot();
        assert_eq!(ids(&state), vec!["a", "b", "c"]);
        assert!(state.has_more);
        assert_eq!(state.last_error, None);
        assert!(!state.is_loading);
        assert_eq!(state.poll_state.as_ref().unwrap().status, PollStatus::Succeeded);
        assert_eq!(h.api.calls(), 4);
        assert_eq!(
            h.sleeper.recorded(),
            vec![
                Duration::from_millis(2000),
                Duration::from_millis(3000),
                Duration::from_millis(4500)
            ]
        );
        assert!(state
            .items
            .iter()
            .all(|j| j.salary_estimate.as_deref() == Some("$50k - $60k")));
    }

    #[tokio::test]
    async fn test_search_sends_page_zero_even_if_filters_say_otherwise() {
        let h = harness(vec![Ok(SearchReply::Ready(page_of(&["a"], false)))]);
        h.session.search(engineer().with_page(5)).await;

        let query = &h.api.queries()[0];
        assert_eq!(query.get("page"), Some("0"));
        assert_eq!(query.get("limit"), Some("3"));
        assert_eq!(query.get("what"), Some("engineer"));
        assert_eq!(h.session.snapshot().filters.page, 0);
    }

    #[tokio::test]
    async fn test_load_more_without_more_is_noop() {
        let h = harness(vec![Ok(SearchReply::Ready(page_of(&["a"], false)))]);
        h.session.search(engineer()).await;
        let before = h.session.snapshot();

        h.session.load_more().await;

        assert_eq!(h.session.snapshot(), before);
        assert_eq!(h.api.calls(), 1);
    }

    #[tokio::test]
    async fn test_load_more_appends_next_page_without_duplicates() {
        let h = harness(vec![
            Ok(SearchReply::Ready(page_of(&["a", "b", "c"], true))),
            Ok(SearchReply::Ready(page_of(&["c", "d"], false))),
        ]);
        h.session.search(engineer()).await;
        h.session.load_more().await;

        let state = h.session.snapshot();
        assert_eq!(ids(&state), vec!["a", "b", "c", "d"]);
        assert!(!state.has_more);
        assert_eq!(state.filters.page, 1);
        assert_eq!(h.api.queries()[1].get("page"), Some("1"));
    }

    #[tokio::test]
    async fn test_rate_limited_search_keeps_previous_items() {
        let h = harness(vec![
            Ok(SearchReply::Ready(page_of(&["a", "b"], true))),
            Err(ClientError::RateLimited),
        ]);
        h.session.search(engineer()).await;
        h.session
            .search(SearchFilters::default().with_free_text("designer"))
            .await;

        let state = h.session.snapshot();
        assert_eq!(ids(&state), vec!["a", "b"]);
        assert!(state
            .last_error
            .as_deref()
            .unwrap()
            .contains("Too many searches"));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_failed_load_more_leaves_items_and_cursor() {
        let h = harness(vec![
            Ok(SearchReply::Ready(page_of(&["a"], true))),
            Err(ClientError::ServerStatus(502)),
        ]);
        h.session.search(engineer()).await;
        h.session.load_more().await;

        let state = h.session.snapshot();
        assert_eq!(ids(&state), vec!["a"]);
        assert_eq!(state.filters.page, 0);
        assert!(state.has_more);
        assert_eq!(state.last_error.as_deref(), Some("Server error: 502"));

        // Retrying asks for the same page again.
        h.api.push(Ok(SearchReply::Ready(page_of(&["b"], false))));
        h.session.load_more().await;
        assert_eq!(h.api.queries()[2].get("page"), Some("1"));
        assert_eq!(ids(&h.session.snapshot()), vec!["a", "b"]);
        assert_eq!(h.session.snapshot().last_error, None);
    }

    #[tokio::test]
    async fn test_fresh_search_replaces_even_with_empty_page() {
        let h = harness(vec![
            Ok(SearchReply::Ready(page_of(&["a", "b"], true))),
            Ok(SearchReply::Ready(page_of(&[], false))),
        ]);
        h.session.search(engineer()).await;
        h.session
            .search(SearchFilters::default().with_free_text("astronaut"))
            .await;

        let state = h.session.snapshot();
        assert!(state.items.is_empty());
        assert!(!state.has_more);
        assert_eq!(state.last_error, None);
    }

    #[tokio::test]
    async fn test_poll_timeout_sets_error() {
        let script = (0..30)
            .map(|_| Ok(SearchReply::Processing(extending("Still searching"))))
            .collect();
        let h = harness(script);

        h.session.search(engineer()).await;

        let state = h.session.snapshot();
        assert!(state.items.is_empty());
        assert!(state.last_error.as_deref().unwrap().contains("longer than expected"));
        assert_eq!(state.poll_state.as_ref().unwrap().status, PollStatus::TimedOut);
        // Initial request plus 20 polls.
        assert_eq!(h.api.calls(), 21);
    }

    #[tokio::test]
    async fn test_display_uses_current_sort() {
        let mut cheap = JobListing::new("cheap", "Cheap");
        cheap.max_salary = Some(10.0);
        let mut rich = JobListing::new("rich", "Rich");
        rich.max_salary = Some(99.0);
        let page = SearchResultPage {
            items: vec![cheap, rich],
            total_results: 2,
            has_more: false,
            strategy_level: Some(1),
            cached: true,
        };
        let h = harness(vec![Ok(SearchReply::Ready(page))]);

        h.session.search(engineer().with_sort(SortKey::Salary)).await;

        let state = h.session.snapshot();
        assert_eq!(state.strategy_level, Some(1));
        let display: Vec<_> = state.display().into_iter().map(|j| j.id).collect();
        assert_eq!(display, vec!["rich", "cheap"]);
        assert_eq!(ids(&state), vec!["cheap", "rich"]);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let h = harness(vec![Ok(SearchReply::Ready(page_of(&["a"], false)))]);
        let mut rx = h.session.subscribe();

        h.session.search(engineer()).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(ids(&rx.borrow_and_update()), vec!["a"]);
    }

    /// Blocks its first request until released; later requests answer at once.
    struct GatedApi {
        started: Notify,
        release: Notify,
        calls: AtomicUsize,
    }

    impl GatedApi {
        fn new() -> Self {
            Self {
                started: Notify::new(),
                release: Notify::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl JobSearchApi for GatedApi {
        async fn search(&self, _query: &QueryParameters) -> Result<SearchReply, ClientError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.started.notify_one();
                self.release.notified().await;
                return Ok(SearchReply::Ready(page_of(&["stale"], true)));
            }
            Ok(SearchReply::Ready(page_of(&["fresh"], false)))
        }
    }

    fn gated_session(api: Arc<GatedApi>) -> JobSearchSession {
        JobSearchSession::new(
            api,
            Arc::new(FakeSalaryLookup::answering(Ok("est".to_string()))),
            Arc::new(RecordingSleeper::default()),
            PollConfig::default(),
            3,
        )
    }

    #[tokio::test]
    async fn test_newer_search_supersedes_in_flight_one() {
        let api = Arc::new(GatedApi::new());
        let session = gated_session(api.clone());

        let first = session.search(engineer());
        let second = async {
            api.started.notified().await;
            session
                .search(SearchFilters::default().with_free_text("nurse"))
                .await;
            api.release.notify_one();
        };
        tokio::join!(first, second);

        let state = session.snapshot();
        assert_eq!(ids(&state), vec!["fresh"]);
        assert!(!state.has_more);
        assert_eq!(state.filters.free_text, "nurse");
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_load_more_ignored_while_search_in_flight() {
        let api = Arc::new(GatedApi::new());
        let session = gated_session(api.clone());

        let first = session.search(engineer());
        let second = async {
            api.started.notified().await;
            session.load_more().await;
            assert_eq!(api.calls.load(Ordering::SeqCst), 1);
            api.release.notify_one();
        };
        tokio::join!(first, second);

        assert_eq!(ids(&session.snapshot()), vec!["stale"]);
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_results() {
        let api = Arc::new(GatedApi::new());
        let session = gated_session(api.clone());

        let first = session.search(engineer());
        let second = async {
            api.started.notified().await;
            session.reset();
            api.release.notify_one();
        };
        tokio::join!(first, second);

        let state = session.snapshot();
        assert!(state.items.is_empty());
        assert!(!state.is_loading);
        assert_eq!(state.filters.page_size, 3);
    }

    /// Salary lookup whose first call waits for a release signal.
    struct GatedSalaryLookup {
        started: Notify,
        release: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SalaryLookup for GatedSalaryLookup {
        async fn estimate(&self, _request: &SalaryEstimateRequest) -> Result<String, ClientError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.started.notify_one();
                self.release.notified().await;
                return Ok("slow".to_string());
            }
            Ok("fast".to_string())
        }
    }

    #[tokio::test]
    async fn test_superseded_enrichment_never_lands() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(SearchReply::Ready(page_of(&["stale"], true))),
            Ok(SearchReply::Ready(page_of(&["fresh"], false))),
        ]));
        let lookup = Arc::new(GatedSalaryLookup {
            started: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let session = JobSearchSession::new(
            api.clone(),
            lookup.clone(),
            Arc::new(RecordingSleeper::default()),
            PollConfig::default(),
            3,
        );

        let first = session.search(engineer());
        let second = async {
            lookup.started.notified().await;
            session
                .search(SearchFilters::default().with_free_text("nurse"))
                .await;
            assert_eq!(ids(&session.snapshot()), vec!["fresh"]);
            lookup.release.notify_one();
        };
        tokio::join!(first, second);

        let state = session.snapshot();
        assert_eq!(ids(&state), vec!["fresh"]);
        assert_eq!(state.items[0].salary_estimate.as_deref(), Some("fast"));
        assert!(!state.has_more);
        assert_eq!(state.filters.free_text, "nurse");
        assert_eq!(state.generation, 2);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    /// Sleeper whose first sleep waits for a release signal.
    struct GatedSleeper {
        started: Notify,
        release: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Sleeper for GatedSleeper {
        async fn sleep(&self, _duration: Duration) {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.started.notify_one();
                self.release.notified().await;
            }
        }
    }

    #[tokio::test]
    async fn test_search_issued_while_polling_stops_the_old_poll_loop() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(SearchReply::Processing(processing("Search started"))),
            Ok(SearchReply::Ready(page_of(&["fresh"], false))),
            Ok(SearchReply::Ready(page_of(&["stale"], true))),
        ]));
        let sleeper = Arc::new(GatedSleeper {
            started: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let session = JobSearchSession::new(
            api.clone(),
            Arc::new(FakeSalaryLookup::answering(Ok("est".to_string()))),
            sleeper.clone(),
            PollConfig::default(),
            3,
        );
        let mut rx = session.subscribe();

        let first = session.search(engineer());
        let second = async {
            sleeper.started.notified().await;
            assert_eq!(
                session.snapshot().poll_state.map(|p| p.status),
                Some(PollStatus::Polling)
            );
            session
                .search(SearchFilters::default().with_free_text("nurse"))
                .await;
            rx.borrow_and_update();
            sleeper.release.notify_one();
        };
        tokio::join!(first, second);

        let state = session.snapshot();
        assert_eq!(ids(&state), vec!["fresh"]);
        assert_eq!(state.poll_state, None);
        assert_eq!(state.generation, 2);
        // The old loop woke up, saw it was superseded and sent nothing.
        assert_eq!(api.calls(), 2);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_load_more_at_last_page_number_does_not_overflow() {
        let h = harness(vec![Ok(SearchReply::Ready(page_of(&["a"], false)))]);
        h.session.state.send_modify(|state| {
            state.filters.page = u32::MAX;
            state.has_more = true;
        });

        h.session.load_more().await;

        assert_eq!(h.api.queries()[0].get("page"), Some(u32::MAX.to_string().as_str()));
        assert_eq!(ids(&h.session.snapshot()), vec!["a"]);
    }
}

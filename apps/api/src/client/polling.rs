//! Polling state machine for searches answered with a processing signal.
//!
//! `idle → polling → {succeeded | failed | timedOut}`. The transition logic
//! lives on `PollState` and is synchronous; `PollingController` only adds the
//! timer and the network call around it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::client::error::ClientError;
use crate::client::query::QueryParameters;
use crate::client::transport::{JobSearchApi, ProcessingNotice, SearchReply};
use crate::models::SearchResultPage;

#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Wait before the first poll after the processing signal.
    pub initial_delay: Duration,
    pub initial_interval: Duration,
    pub backoff_factor: f64,
    pub max_interval: Duration,
    /// Consecutive still-processing responses tolerated before timing out.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(2000),
            initial_interval: Duration::from_millis(2000),
            backoff_factor: 1.5,
            max_interval: Duration::from_millis(10_000),
            max_attempts: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

/// Transient state of one in-flight asynchronous search.
#[derive(Debug, Clone, PartialEq)]
pub struct PollState {
    pub attempt_count: u32,
    pub interval: Duration,
    pub started_at: DateTime<Utc>,
    pub status: PollStatus,
    /// Human-readable progress line for the presentation layer.
    pub message: String,
}

/// What to do after a still-processing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Continue { delay: Duration },
    TimedOut,
}

impl PollState {
    pub fn start(config: &PollConfig, message: impl Into<String>) -> Self {
        Self {
            attempt_count: 0,
            interval: config.initial_interval.min(config.max_interval),
            started_at: Utc::now(),
            status: PollStatus::Polling,
            message: message.into(),
        }
    }

    pub fn begin_attempt(&mut self) {
        self.attempt_count += 1;
    }

    /// Applies a still-processing response received by the current attempt.
    pub fn observe_processing(&mut self, notice: &ProcessingNotice, config: &PollConfig) -> PollStep {
        if self.attempt_count >= config.max_attempts {
            self.status = PollStatus::TimedOut;
            self.message = format!("Search timed out after {} attempts", self.attempt_count);
            return PollStep::TimedOut;
        }

        if notice.search_in_progress {
            let grown = (self.interval.as_millis() as f64 * config.backoff_factor).round() as u64;
            self.interval = Duration::from_millis(grown)
                .max(self.interval)
                .min(config.max_interval);
            self.message = format!(
                "{} (extending search, next check in {:.1}s)",
                notice.message,
                self.interval.as_secs_f64()
            );
        } else {
            self.message = notice.message.clone();
        }

        PollStep::Continue {
            delay: self.interval,
        }
    }

    pub fn succeed(&mut self) {
        self.status = PollStatus::Succeeded;
    }

    pub fn fail(&mut self, err: &ClientError) {
        self.status = PollStatus::Failed;
        self.message = err.to_string();
    }
}

/// Timer seam; tests substitute one that returns immediately.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Ready(SearchResultPage),
    /// A newer operation took over; nothing may be written back.
    Superseded,
}

pub struct PollingController<'a> {
    api: &'a dyn JobSearchApi,
    sleeper: &'a dyn Sleeper,
    config: &'a PollConfig,
}

impl<'a> PollingController<'a> {
    pub fn new(api: &'a dyn JobSearchApi, sleeper: &'a dyn Sleeper, config: &'a PollConfig) -> Self {
        Self {
            api,
            sleeper,
            config,
        }
    }

    /// Re-issues `query` until it is ready, fails, or runs out of attempts.
    ///
    /// `publish` is handed every state change and returns `false` once the
    /// caller's operation has been superseded, which ends the loop without
    /// further requests.
    pub async fn run<F>(
        &self,
        query: &QueryParameters,
        notice: ProcessingNotice,
        mut publish: F,
    ) -> Result<PollOutcome, ClientError>
    where
        F: FnMut(&PollState) -> bool + Send,
    {
        let mut state = PollState::start(self.config, notice.message);
        if !publish(&state) {
            return Ok(PollOutcome::Superseded);
        }
        info!("Search is processing, polling for results");

        let mut delay = self.config.initial_delay;
        loop {
            self.sleeper.sleep(delay).await;

            state.begin_attempt();
            if !publish(&state) {
                debug!(attempt = state.attempt_count, "Poll loop superseded");
                return Ok(PollOutcome::Superseded);
            }
            debug!(attempt = state.attempt_count, "Polling search");

            match self.api.search(query).await {
                Ok(SearchReply::Ready(page)) => {
                    state.succeed();
                    if !publish(&state) {
                        return Ok(PollOutcome::Superseded);
                    }
                    info!(
                        attempts = state.attempt_count,
                        items = page.items.len(),
                        "Polled search is ready"
                    );
                    return Ok(PollOutcome::Ready(page));
                }
                Ok(SearchReply::Processing(notice)) => {
                    match state.observe_processing(&notice, self.config) {
                        PollStep::Continue { delay: next } => {
                            if !publish(&state) {
                                return Ok(PollOutcome::Superseded);
                            }
                            delay = next;
                        }
                        PollStep::TimedOut => {
                            if !publish(&state) {
                                return Ok(PollOutcome::Superseded);
                            }
                            warn!(attempts = state.attempt_count, "Search polling timed out");
                            return Err(ClientError::PollTimedOut {
                                attempts: state.attempt_count,
                            });
                        }
                    }
                }
                Err(err) => {
                    state.fail(&err);
                    if !publish(&state) {
                        return Ok(PollOutcome::Superseded);
                    }
                    warn!(attempt = state.attempt_count, "Polling failed: {err}");
                    return Err(err);
                }
            }
        }
    }
}

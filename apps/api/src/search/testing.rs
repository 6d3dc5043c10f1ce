//! Test doubles for the server-side search seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{JobListing, SalaryEstimateRequest};
use crate::search::board::{BoardPage, JobBoard, UpstreamError};
use crate::search::query::SearchQuery;
use crate::search::salary::SalaryEstimator;

type Responder = Box<dyn Fn(&SearchQuery) -> Result<Vec<JobListing>, UpstreamError> + Send + Sync>;

/// Job board whose answer is computed from the query it receives.
pub struct FakeBoard {
    respond: Responder,
    delay: Option<Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<SearchQuery>>,
}

impl FakeBoard {
    pub fn with<F>(listings: F) -> Self
    where
        F: Fn(&SearchQuery) -> Vec<JobListing> + Send + Sync + 'static,
    {
        Self::from_responder(Box::new(move |q| Ok(listings(q))))
    }

    pub fn failing<F>(error: F) -> Self
    where
        F: Fn() -> UpstreamError + Send + Sync + 'static,
    {
        Self::from_responder(Box::new(move |_| Err(error())))
    }

    fn from_responder(respond: Responder) -> Self {
        Self {
            respond,
            delay: None,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobBoard for FakeBoard {
    async fn search(&self, query: &SearchQuery) -> Result<BoardPage, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let listings = (self.respond)(query)?;
        Ok(BoardPage {
            total_results: listings.len() as u64,
            listings,
        })
    }
}

/// Estimator that answers every request with the same range.
pub struct FakeEstimator {
    range: String,
    calls: AtomicUsize,
}

impl FakeEstimator {
    pub fn answering(range: &str) -> Self {
        Self {
            range: range.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SalaryEstimator for FakeEstimator {
    async fn estimate(&self, _request: &SalaryEstimateRequest) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.range.clone())
    }
}

//! Upstream job board. Adzuna is the only implementation; the trait is the
//! seam the coordinator and tests use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::JobListing;
use crate::search::query::SearchQuery;

const ADZUNA_API_URL: &str = "https://api.adzuna.com";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Job board rate limit reached")]
    RateLimited,

    #[error("Job board request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Job board error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// One page as reported by the board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardPage {
    pub listings: Vec<JobListing>,
    pub total_results: u64,
}

#[async_trait]
pub trait JobBoard: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<BoardPage, UpstreamError>;
}

#[derive(Clone)]
pub struct AdzunaClient {
    client: Client,
    base_url: String,
    app_id: String,
    app_key: String,
    country: String,
}

impl AdzunaClient {
    pub fn new(app_id: String, app_key: String, country: String) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(20))
                .build()?,
            base_url: ADZUNA_API_URL.to_string(),
            app_id,
            app_key,
            country,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn params(&self, query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("app_id", self.app_id.clone()),
            ("app_key", self.app_key.clone()),
            ("results_per_page", query.limit.to_string()),
            ("content-type", "application/json".to_string()),
        ];
        let mut what = query.what.clone().unwrap_or_default();

        if let Some(location) = &query.location {
            params.push(("where", location.clone()));
        }
        if let Some(min) = query.salary_min {
            params.push(("salary_min", min.to_string()));
        }
        if let Some(max) = query.salary_max {
            params.push(("salary_max", max.to_string()));
        }
        match query.contract_type.as_deref() {
            Some("full_time") => params.push(("full_time", "1".to_string())),
            Some("part_time") => params.push(("part_time", "1".to_string())),
            Some("contract") => params.push(("contract", "1".to_string())),
            // No freelance flag upstream; contract roles plus the keyword come closest.
            Some("freelance") => {
                params.push(("contract", "1".to_string()));
                what = format!("{what} freelance").trim().to_string();
            }
            _ => {}
        }
        match query.sort.as_deref() {
            Some("newest") => params.push(("sort_by", "date".to_string())),
            Some("salary") => params.push(("sort_by", "salary".to_string())),
            _ => {}
        }
        if !what.is_empty() {
            params.push(("what", what));
        }
        params
    }
}

#[async_trait]
impl JobBoard for AdzunaClient {
    async fn search(&self, query: &SearchQuery) -> Result<BoardPage, UpstreamError> {
        // Adzuna pages are 1-based.
        let url = format!(
            "{}/v1/api/jobs/{}/search/{}",
            self.base_url,
            self.country,
            query.page.saturating_add(1)
        );
        let response = self
            .client
            .get(&url)
            .query(&self.params(query))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: AdzunaResponse = response.json().await?;
        debug!(
            count = body.count,
            returned = body.results.len(),
            "Adzuna search returned"
        );

        Ok(BoardPage {
            total_results: body.count,
            listings: body.results.into_iter().map(AdzunaJob::into_listing).collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AdzunaResponse {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    company: Option<Named>,
    #[serde(default)]
    location: Option<Named>,
    #[serde(default)]
    salary_min: Option<f64>,
    #[serde(default)]
    salary_max: Option<f64>,
    /// "1" when the board predicted the salary rather than reading it off the ad.
    #[serde(default)]
    salary_is_predicted: Option<String>,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    contract_time: Option<String>,
    #[serde(default)]
    contract_type: Option<String>,
    #[serde(default)]
    redirect_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    display_name: String,
}

impl AdzunaJob {
    fn into_listing(self) -> JobListing {
        let title = strip_tags(&self.title);
        let description = strip_tags(&self.description);
        let location = self.location.map(|l| l.display_name).unwrap_or_default();
        let remote = [&title, &location, &description]
            .iter()
            .any(|text| text.to_lowercase().contains("remote"))
            .then_some(true);

        let predicted = self.salary_is_predicted.as_deref() == Some("1");
        let (min_salary, max_salary, salary_estimate) = if predicted {
            (None, None, format_range(self.salary_min, self.salary_max))
        } else {
            (self.salary_min, self.salary_max, None)
        };

        let employment_status = [self.contract_time, self.contract_type]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        JobListing {
            id: self.id,
            title,
            company: self.company.map(|c| c.display_name).unwrap_or_default(),
            location,
            description,
            remote,
            min_salary,
            max_salary,
            salary_estimate,
            posted_date: self.created,
            employment_status: (!employment_status.is_empty()).then_some(employment_status),
            apply_url: self.redirect_url,
            match_score: None,
        }
    }
}

fn format_range(min: Option<f64>, max: Option<f64>) -> Option<String> {
    match (min, max) {
        (Some(lo), Some(hi)) if (hi - lo).abs() >= 1.0 => {
            Some(format!("{} - {} (estimated)", thousands(lo), thousands(hi)))
        }
        (Some(v), _) | (None, Some(v)) => Some(format!("~{} (estimated)", thousands(v))),
        (None, None) => None,
    }
}

fn thousands(value: f64) -> String {
    format!("{}k", (value / 1000.0).round() as i64)
}

/// Adzuna highlights search terms with inline `<strong>` tags.
fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

//! Network boundary of the search client.
//!
//! Everything past this module works with normalized `SearchResultPage`s and
//! typed `ClientError`s; status codes and JSON shapes stop here.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::client::error::ClientError;
use crate::client::query::QueryParameters;
use crate::client::ClientConfig;
use crate::models::{
    ErrorBody, ProcessingBody, RawJobListing, SalaryEstimateRequest, SalaryEstimateResponse,
    SearchResponseBody, SearchResultPage,
};

pub const SEARCH_PATH: &str = "/api/v1/jobs/search";
pub const SALARY_ESTIMATE_PATH: &str = "/api/v1/jobs/salary-estimate";

/// "Not ready yet" signal from the search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingNotice {
    pub message: String,
    /// The backend is itself extending an upstream search.
    pub search_in_progress: bool,
}

/// Outcome of a single search request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchReply {
    Ready(SearchResultPage),
    Processing(ProcessingNotice),
}

#[async_trait]
pub trait JobSearchApi: Send + Sync {
    async fn search(&self, query: &QueryParameters) -> Result<SearchReply, ClientError>;
}

#[async_trait]
pub trait SalaryLookup: Send + Sync {
    /// Returns the human-readable estimated range.
    async fn estimate(&self, request: &SalaryEstimateRequest) -> Result<String, ClientError>;
}

/// `reqwest`-backed implementation of both endpoints.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl JobSearchApi for HttpTransport {
    async fn search(&self, query: &QueryParameters) -> Result<SearchReply, ClientError> {
        let request = self
            .client
            .get(self.url(SEARCH_PATH))
            .query(query.pairs());
        let response = self.authorize(request).send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), "Search response received");

        if status == StatusCode::ACCEPTED {
            let text = response.text().await?;
            let body: ProcessingBody = serde_json::from_str(&text).unwrap_or_default();
            return Ok(SearchReply::Processing(ProcessingNotice {
                message: if body.message.trim().is_empty() {
                    "Searching for jobs...".to_string()
                } else {
                    body.message
                },
                search_in_progress: body.search_in_progress.unwrap_or(false),
            }));
        }

        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        let body: SearchResponseBody<RawJobListing> = response.json().await?;
        Ok(SearchReply::Ready(SearchResultPage::from(body)))
    }
}

#[async_trait]
impl SalaryLookup for HttpTransport {
    async fn estimate(&self, request: &SalaryEstimateRequest) -> Result<String, ClientError> {
        let builder = self.client.post(self.url(SALARY_ESTIMATE_PATH)).json(request);
        let response = self.authorize(builder).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: SalaryEstimateResponse = response.json().await?;
        let range = body.range.trim();
        if range.is_empty() {
            return Err(ClientError::Malformed("empty salary range".to_string()));
        }
        Ok(range.to_string())
    }
}

/// Maps a non-2xx response to the client error taxonomy.
async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ClientError::RateLimited;
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
    {
        Some(message) => ClientError::Server {
            status: status.as_u16(),
            message,
        },
        None => ClientError::ServerStatus(status.as_u16()),
    }
}

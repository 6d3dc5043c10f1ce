//! Job search client: query building, polling, pagination, de-duplication and
//! salary enrichment, composed by [`session::JobSearchSession`].
//!
//! Data flows one way: `search`/`load_more` → query → network (→ polling) →
//! enrichment → merge → `SessionState` snapshot for the presentation layer.

pub mod aggregator;
pub mod enricher;
pub mod error;
pub mod polling;
pub mod query;
pub mod session;
pub mod transport;

use std::time::Duration;

pub use error::ClientError;
pub use polling::{PollConfig, PollState, PollStatus};
pub use query::{ContractType, SearchFilters, SortKey};
pub use session::{JobSearchSession, SessionState};
pub use transport::{HttpTransport, JobSearchApi, SalaryLookup};

/// Client-side settings. The per-call timeout is separate from the
/// attempt-based polling limit in [`PollConfig`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            bearer_token: None,
            request_timeout: Duration::from_secs(30),
            page_size: query::DEFAULT_PAGE_SIZE,
            poll: PollConfig::default(),
        }
    }
}

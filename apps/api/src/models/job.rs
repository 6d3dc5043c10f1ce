//! Wire schema shared by the proxy server and the search client.
//!
//! The server always emits `JobListing` in its canonical camelCase shape. The
//! client never trusts that, and decodes through `RawJobListing`, whose
//! `normalize()` is the only place that deals with missing or oddly-typed
//! fields.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A single job posting. `id` is the identity key within a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_salary: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_salary: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_estimate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
}

impl JobListing {
    /// Minimal listing; every optional field empty.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            company: String::new(),
            location: String::new(),
            description: String::new(),
            remote: None,
            min_salary: None,
            max_salary: None,
            salary_estimate: None,
            posted_date: None,
            employment_status: None,
            apply_url: None,
            match_score: None,
        }
    }

    /// True when the board reported at least one salary bound.
    pub fn has_salary_range(&self) -> bool {
        self.min_salary.is_some() || self.max_salary.is_some()
    }

    /// max(minSalary, maxSalary), missing bounds counted as 0.
    pub fn salary_ceiling(&self) -> f64 {
        self.min_salary
            .unwrap_or(0.0)
            .max(self.max_salary.unwrap_or(0.0))
    }
}

/// Lenient decode target for listings arriving over the network.
#[derive(Debug, Default, Deserialize)]
pub struct RawJobListing {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub company: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub remote: Option<Value>,
    #[serde(default, rename = "minSalary", alias = "min_salary", alias = "salary_min")]
    pub min_salary: Option<Value>,
    #[serde(default, rename = "maxSalary", alias = "max_salary", alias = "salary_max")]
    pub max_salary: Option<Value>,
    #[serde(default, rename = "salaryEstimate", alias = "salary_estimate")]
    pub salary_estimate: Option<Value>,
    #[serde(default, rename = "postedDate", alias = "posted_date", alias = "created")]
    pub posted_date: Option<Value>,
    #[serde(default, rename = "employmentStatus", alias = "employment_status")]
    pub employment_status: Option<Value>,
    #[serde(default, rename = "applyUrl", alias = "apply_url", alias = "redirect_url")]
    pub apply_url: Option<Value>,
    #[serde(default, rename = "matchScore", alias = "match_score")]
    pub match_score: Option<Value>,
}

impl RawJobListing {
    /// Converts into the canonical shape. Returns `None` when no usable id is
    /// present, since such an entry cannot take part in de-duplication.
    pub fn normalize(self) -> Option<JobListing> {
        let id = match self.id.as_ref().and_then(scalar_to_string) {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                warn!(title = ?self.title, "Dropping job listing without an id");
                return None;
            }
        };

        Some(JobListing {
            id,
            title: text(self.title.as_ref()).unwrap_or_default(),
            company: self.company.as_ref().and_then(display_name).unwrap_or_default(),
            location: self.location.as_ref().and_then(display_name).unwrap_or_default(),
            description: text(self.description.as_ref()).unwrap_or_default(),
            remote: self.remote.as_ref().and_then(flag),
            min_salary: self.min_salary.as_ref().and_then(number),
            max_salary: self.max_salary.as_ref().and_then(number),
            salary_estimate: text(self.salary_estimate.as_ref()),
            posted_date: self.posted_date.as_ref().and_then(timestamp),
            employment_status: text(self.employment_status.as_ref()),
            apply_url: text(self.apply_url.as_ref()),
            match_score: self.match_score.as_ref().and_then(number),
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Any scalar as trimmed text; blank counts as absent.
fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(scalar_to_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Booleans also arrive as "true"/"yes"/"1" or 0/1.
fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Accepts either a plain string or an object carrying `display_name`.
fn display_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("display_name")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// RFC 3339 strings, or unix timestamps (seconds, or milliseconds when large).
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw > 100_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}

/// Paging metadata attached to every ready search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_strategy: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

/// 200 body of the search endpoint. The client decodes it with
/// `T = RawJobListing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponseBody<T = JobListing> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub metadata: SearchMetadata,
}

/// 202 body: the backend has not produced results yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingBody {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_in_progress: Option<bool>,
}

/// Body of non-2xx responses, as far as the client cares.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Top-level `message`, else the nested `error.message` our own server emits.
    pub fn into_message(self) -> Option<String> {
        self.message
            .or_else(|| self.error.and_then(|e| e.message))
            .filter(|m| !m.trim().is_empty())
    }
}

/// One page of normalized results plus the metadata that came with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResultPage {
    pub items: Vec<JobListing>,
    pub total_results: u64,
    pub has_more: bool,
    pub strategy_level: Option<u8>,
    pub cached: bool,
}

impl From<SearchResponseBody<RawJobListing>> for SearchResultPage {
    fn from(body: SearchResponseBody<RawJobListing>) -> Self {
        Self {
            items: body
                .data
                .into_iter()
                .filter_map(RawJobListing::normalize)
                .collect(),
            total_results: body.metadata.total_results,
            has_more: body.metadata.has_more,
            strategy_level: body.metadata.api_strategy,
            cached: body.metadata.cached.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryEstimateRequest {
    pub id: String,
    pub title: String,
    pub location: String,
}

impl From<&JobListing> for SalaryEstimateRequest {
    fn from(listing: &JobListing) -> Self {
        Self {
            id: listing.id.clone(),
            title: listing.title.clone(),
            location: listing.location.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryEstimateResponse {
    pub range: String,
}

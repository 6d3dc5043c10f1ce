use serde::Deserialize;

use crate::errors::AppError;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 50;
/// The job board stops paging long before this.
pub const MAX_PAGE: u32 = 500;

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Query string accepted by `GET /api/v1/jobs/search`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub what: Option<String>,
    #[serde(default, rename = "where")]
    pub location: Option<String>,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub salary_min: Option<u32>,
    #[serde(default)]
    pub salary_max: Option<u32>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl SearchQuery {
    /// Rejects inputs the upstream board would choke on; blank strings are
    /// normalized to absent.
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.what = non_blank(self.what);
        self.location = non_blank(self.location);
        self.contract_type = non_blank(self.contract_type).map(|c| c.to_ascii_lowercase());
        self.sort = non_blank(self.sort).map(|s| s.to_ascii_lowercase());

        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        if self.page > MAX_PAGE {
            return Err(AppError::Validation(format!(
                "page must not exceed {MAX_PAGE}"
            )));
        }
        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            if min > max {
                return Err(AppError::Validation(
                    "salary_min must not exceed salary_max".to_string(),
                ));
            }
        }
        if let Some(contract) = &self.contract_type {
            if !matches!(
                contract.as_str(),
                "full_time" | "part_time" | "contract" | "freelance"
            ) {
                return Err(AppError::Validation(format!(
                    "unknown contract_type '{contract}'"
                )));
            }
        }
        if let Some(sort) = &self.sort {
            if !matches!(sort.as_str(), "relevance" | "newest" | "salary" | "match") {
                return Err(AppError::Validation(format!("unknown sort '{sort}'")));
            }
        }
        Ok(self)
    }

    /// Identity of the filter set, ignoring paging.
    pub fn base_key(&self) -> String {
        format!(
            "what={}|where={}|contract={}|smin={}|smax={}|sort={}",
            self.what.as_deref().unwrap_or("").to_lowercase(),
            self.location.as_deref().unwrap_or("").to_lowercase(),
            self.contract_type.as_deref().unwrap_or(""),
            self.salary_min.map(|v| v.to_string()).unwrap_or_default(),
            self.salary_max.map(|v| v.to_string()).unwrap_or_default(),
            self.sort.as_deref().unwrap_or(""),
        )
    }

    /// Cache key of this exact page.
    pub fn cache_key(&self) -> String {
        format!("search:{}|page={}|limit={}", self.base_key(), self.page, self.limit)
    }

    pub fn has_more(&self, total_results: u64) -> bool {
        (u64::from(self.page) + 1).saturating_mul(u64::from(self.limit)) < total_results
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

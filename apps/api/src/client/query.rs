//! Search filters and their canonical query-string form.

use serde::{Deserialize, Serialize};

/// Results per page when the caller does not override it.
pub const DEFAULT_PAGE_SIZE: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    #[default]
    Any,
    FullTime,
    PartTime,
    Contract,
    Freelance,
}

impl ContractType {
    /// Query value, or `None` for "no preference".
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            ContractType::Any => None,
            ContractType::FullTime => Some("full_time"),
            ContractType::PartTime => Some("part_time"),
            ContractType::Contract => Some("contract"),
            ContractType::Freelance => Some("freelance"),
        }
    }

    /// Parses a UI value; `""`, `"all"` and `"any"` mean no preference.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" | "any" => Some(ContractType::Any),
            "full_time" | "full-time" => Some(ContractType::FullTime),
            "part_time" | "part-time" => Some(ContractType::PartTime),
            "contract" => Some(ContractType::Contract),
            "freelance" => Some(ContractType::Freelance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Relevance,
    Newest,
    Salary,
    Match,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Relevance => "relevance",
            SortKey::Newest => "newest",
            SortKey::Salary => "salary",
            SortKey::Match => "match",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "relevance" => Some(SortKey::Relevance),
            "newest" | "date" => Some(SortKey::Newest),
            "salary" => Some(SortKey::Salary),
            "match" => Some(SortKey::Match),
            _ => None,
        }
    }
}

/// Expands a salary-range UI bucket into explicit bounds.
///
/// `"50k-75k"` → `(Some(50000), Some(75000))`, `"150k+"` → `(Some(150000), None)`,
/// and the no-preference values `""`/`"all"` → `(None, None)`. Unknown buckets
/// also yield no bounds.
pub fn salary_bucket_bounds(bucket: &str) -> (Option<u32>, Option<u32>) {
    let bucket = bucket.trim().to_ascii_lowercase();
    if bucket.is_empty() || bucket == "all" {
        return (None, None);
    }
    if let Some(low) = bucket.strip_suffix('+') {
        return (parse_thousands(low), None);
    }
    match bucket.split_once('-') {
        Some((low, high)) => match (parse_thousands(low), parse_thousands(high)) {
            (Some(low), Some(high)) => (Some(low), Some(high)),
            _ => (None, None),
        },
        None => (None, None),
    }
}

fn parse_thousands(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    match raw.strip_suffix('k') {
        Some(num) => num.trim().parse::<u32>().ok()?.checked_mul(1000),
        None => raw.parse::<u32>().ok(),
    }
}

/// User-facing filter state.
///
/// Every `with_*` setter other than [`SearchFilters::with_page`] resets the
/// page to 0, so a changed filter set never keeps a stale page cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub free_text: String,
    pub location: String,
    pub contract_type: ContractType,
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
    pub sort_key: SortKey,
    pub page: u32,
    pub page_size: u32,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            free_text: String::new(),
            location: String::new(),
            contract_type: ContractType::Any,
            salary_min: None,
            salary_max: None,
            sort_key: SortKey::Relevance,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchFilters {
    pub fn with_free_text(mut self, text: impl Into<String>) -> Self {
        self.free_text = text.into();
        self.page = 0;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self.page = 0;
        self
    }

    pub fn with_contract_type(mut self, contract_type: ContractType) -> Self {
        self.contract_type = contract_type;
        self.page = 0;
        self
    }

    pub fn with_salary(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.salary_min = min;
        self.salary_max = max;
        self.page = 0;
        self
    }

    pub fn with_salary_bucket(self, bucket: &str) -> Self {
        let (min, max) = salary_bucket_bounds(bucket);
        self.with_salary(min, max)
    }

    pub fn with_sort(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self.page = 0;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

/// Ordered query parameters, ready for `reqwest::RequestBuilder::query`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters(Vec<(&'static str, String)>);

impl QueryParameters {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.0
    }

    fn push(&mut self, name: &'static str, value: impl Into<String>) {
        self.0.push((name, value.into()));
    }
}

/// Turns filter state into the canonical query.
///
/// No-preference values are omitted, as is the default `relevance` sort so
/// the backend applies its own ordering. `page` and `limit` are always sent.
pub fn build(filters: &SearchFilters) -> QueryParameters {
    let mut params = QueryParameters::default();

    if let Some(text) = preference(&filters.free_text) {
        params.push("what", text);
    }
    if let Some(location) = preference(&filters.location) {
        params.push("where", location);
    }
    if let Some(contract) = filters.contract_type.as_param() {
        params.push("contract_type", contract);
    }
    if let Some(min) = filters.salary_min {
        params.push("salary_min", min.to_string());
    }
    if let Some(max) = filters.salary_max {
        params.push("salary_max", max.to_string());
    }
    if filters.sort_key != SortKey::Relevance {
        params.push("sort", filters.sort_key.as_str());
    }
    params.push("page", filters.page.to_string());
    params.push("limit", filters.page_size.to_string());

    params
}

fn preference(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(trimmed)
    }
}

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::{SalaryEstimateRequest, SalaryEstimateResponse};
use crate::search::cache::{get_json, put_json, SearchCache};
use crate::search::prompts::{render_salary_prompt, salary_estimate_system};

/// Estimates stay valid much longer than search pages.
pub const SALARY_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Produces a human-readable salary range for a listing that has none.
#[async_trait]
pub trait SalaryEstimator: Send + Sync {
    async fn estimate(&self, request: &SalaryEstimateRequest) -> Result<String, AppError>;
}

/// Asks the model for a range.
pub struct LlmSalaryEstimator {
    llm: LlmClient,
}

impl LlmSalaryEstimator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl SalaryEstimator for LlmSalaryEstimator {
    async fn estimate(&self, request: &SalaryEstimateRequest) -> Result<String, AppError> {
        let prompt = render_salary_prompt(&request.title, &request.location);
        let answer: SalaryEstimateResponse = self
            .llm
            .call_json(&prompt, &salary_estimate_system())
            .await
            .map_err(|e| AppError::Llm(e.to_string()))?;

        let range = answer.range.trim();
        if range.is_empty() {
            return Err(AppError::Llm("model returned an empty range".to_string()));
        }
        Ok(range.to_string())
    }
}

/// Validates the request and answers from cache when the listing was
/// estimated before.
pub async fn estimate_cached(
    estimator: &dyn SalaryEstimator,
    cache: &dyn SearchCache,
    request: &SalaryEstimateRequest,
) -> Result<SalaryEstimateResponse, AppError> {
    if request.id.trim().is_empty() {
        return Err(AppError::Validation("id is required".to_string()));
    }
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }

    let key = format!("salary:{}", request.id);
    if let Some(cached) = get_json::<SalaryEstimateResponse>(cache, &key).await {
        debug!(id = %request.id, "Salary estimate served from cache");
        return Ok(cached);
    }

    let range = estimator.estimate(request).await?;
    info!(id = %request.id, "Estimated salary range");
    let response = SalaryEstimateResponse { range };
    put_json(cache, &key, &response, SALARY_CACHE_TTL).await;
    Ok(response)
}

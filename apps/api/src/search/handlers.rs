use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::errors::AppError;
use crate::models::{SalaryEstimateRequest, SalaryEstimateResponse};
use crate::search::coordinator::SearchOutcome;
use crate::search::query::SearchQuery;
use crate::search::salary::estimate_cached;
use crate::state::AppState;

/// GET /api/v1/jobs/search
/// 200 with a page when results are ready, 202 while the fetch is still running.
pub async fn handle_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    let query = query.validated()?;
    match state.search.lookup(query).await? {
        SearchOutcome::Ready(body) => Ok((StatusCode::OK, Json(body)).into_response()),
        SearchOutcome::Pending(body) => Ok((StatusCode::ACCEPTED, Json(body)).into_response()),
    }
}

/// POST /api/v1/jobs/salary-estimate
pub async fn handle_salary_estimate(
    State(state): State<AppState>,
    Json(req): Json<SalaryEstimateRequest>,
) -> Result<Json<SalaryEstimateResponse>, AppError> {
    let response = estimate_cached(state.salary.as_ref(), state.cache.as_ref(), &req).await?;
    Ok(Json(response))
}

pub mod health;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::search::handlers;
use crate::state::AppState;

/// Rejects `/api/v1/*` calls without the configured bearer token.
/// A no-op when no token is configured.
async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.config.api_token.as_deref() {
        let provided = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if provided != Some(expected) {
            return Err(AppError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/v1/jobs/search", get(handlers::handle_search))
        .route(
            "/api/v1/jobs/salary-estimate",
            post(handlers::handle_salary_estimate),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(api)
        .with_state(state)
}

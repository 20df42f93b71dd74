//! Health checks, mounted at `/health/*`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Assemble the health check router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
}

/// Liveness check: always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/liveness",
    responses((status = 200, description = "Process is alive", body = String)),
    tag = "health"
)]
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check.
///
/// Returns 200 "ready" once a registry with at least one entity is loaded,
/// 503 otherwise.
#[utoipa::path(
    get,
    path = "/health/readiness",
    responses(
        (status = 200, description = "Ready to serve traffic", body = String),
        (status = 503, description = "Registry not usable"),
    ),
    tag = "health"
)]
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.service.registry().is_empty() {
        return (StatusCode::SERVICE_UNAVAILABLE, "registry empty").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}

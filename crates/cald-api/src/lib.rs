//! # cald-api: HTTP Entry Point for the Ontology Service
//!
//! ## API Surface
//!
//! | Route                                         | Module                 |
//! |-----------------------------------------------|------------------------|
//! | `GET  /v1/ontology/entities`                  | [`routes::ontology`]   |
//! | `GET  /v1/ontology/entities/{name}/schema`    | [`routes::ontology`]   |
//! | `POST /v1/validate/{name}`                    | [`routes::validate`]   |
//! | `GET  /health/liveness`, `/health/readiness`  | [`routes::health`]     |
//! | `GET  /metrics`                               | Prometheus scrape      |
//! | `GET  /openapi.json`                          | [`openapi`]            |

pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Maximum accepted request body (2 MiB).
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(routes::health::router())
        .merge(routes::ontology::router())
        .merge(routes::validate::router())
        .merge(openapi::router());

    if state.config.metrics_enabled {
        router = router.route("/metrics", get(prometheus_metrics));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

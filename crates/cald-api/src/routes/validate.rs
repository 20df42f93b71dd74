//! # Validation Route
//!
//! `POST /v1/validate/{entity_name}` takes the raw document as the request
//! body and validates it against the named entity. Every call is audited
//! by the ontology service. The audit actor defaults to the configured one
//! and can be overridden per request with the `x-actor` header.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use cald_schema::{ServiceError, ValidationIssue, ValidationResult};

use crate::error::AppError;
use crate::state::AppState;

/// Header naming the caller recorded in the audit trail.
pub const ACTOR_HEADER: &str = "x-actor";

/// Assemble the validation router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/validate/{entity_name}", post(validate_document))
}

/// Validation outcome as returned to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    pub ok: bool,
    /// Each issue carries `path`, `kind`, `detail` and, for type
    /// mismatches, `expected` and `observed`.
    #[schema(value_type = Vec<Object>)]
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    /// Normalized document; present only when `ok`.
    #[schema(value_type = Option<Object>)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl From<ValidationResult> for ValidationResponse {
    fn from(result: ValidationResult) -> Self {
        Self {
            ok: result.ok,
            errors: result.errors,
            value: result.value,
        }
    }
}

/// Validate a document against an entity schema.
#[utoipa::path(
    post,
    path = "/v1/validate/{entity_name}",
    params(
        ("entity_name" = String, Path, description = "Registry entity name"),
        ("x-actor" = Option<String>, Header, description = "Audit actor override"),
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Document is valid", body = ValidationResponse),
        (status = 422, description = "Document failed validation or could not be decoded", body = ValidationResponse),
        (status = 404, description = "Unknown entity", body = crate::error::ErrorBody),
        (status = 500, description = "Internal failure", body = crate::error::ErrorBody),
    ),
    tag = "validation"
)]
async fn validate_document(
    State(state): State<AppState>,
    Path(entity_name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let actor = headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| state.service.config().actor.clone());

    let service = state.service.clone();
    let entity = entity_name.clone();
    let outcome = tokio::task::spawn_blocking(move || service.validate_as(&actor, &entity, &body))
        .await
        .map_err(|e| AppError::Internal(format!("validation task failed: {e}")))?;

    record_metric(&entity_name, &outcome);

    let result = outcome?;
    let status = if result.ok {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(ValidationResponse::from(result))).into_response())
}

fn record_metric(entity: &str, outcome: &Result<ValidationResult, ServiceError>) {
    let status = match outcome {
        Ok(result) if result.ok => "success",
        Ok(_) => "failed_validation",
        Err(err) => err.audit_status().as_str(),
    };
    metrics::counter!(
        "cald_validations_total",
        "entity" => entity.to_string(),
        "status" => status
    )
    .increment(1);
}

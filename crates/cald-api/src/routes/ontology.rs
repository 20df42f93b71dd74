//! # Ontology Routes
//!
//! - `GET /v1/ontology/entities`: entity names in declaration order
//! - `GET /v1/ontology/entities/{entity_name}/schema`: JSON Schema export

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

/// Assemble the ontology router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/ontology/entities", get(list_entities))
        .route(
            "/v1/ontology/entities/{entity_name}/schema",
            get(entity_schema),
        )
}

/// Declared entity names.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntityList {
    pub entities: Vec<String>,
}

/// List every entity the registry declares.
#[utoipa::path(
    get,
    path = "/v1/ontology/entities",
    responses((status = 200, description = "Entity names", body = EntityList)),
    tag = "ontology"
)]
async fn list_entities(State(state): State<AppState>) -> Json<EntityList> {
    Json(EntityList {
        entities: state.service.list_entities(),
    })
}

/// Export the compiled schema of one entity as JSON Schema (draft 2020-12).
#[utoipa::path(
    get,
    path = "/v1/ontology/entities/{entity_name}/schema",
    params(("entity_name" = String, Path, description = "Registry entity name")),
    responses(
        (status = 200, description = "JSON Schema document", body = serde_json::Value),
        (status = 404, description = "Unknown entity", body = crate::error::ErrorBody),
    ),
    tag = "ontology"
)]
async fn entity_schema(
    State(state): State<AppState>,
    Path(entity_name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let schema = state.service.json_schema(&entity_name)?;
    Ok(Json(schema))
}

//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI 3.1 spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the validation service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "CALD Ontology Validation API",
        version = "0.1.0",
        description = "Validates documents against entity schemas compiled from the ontology registry.\n\nEvery validation attempt is recorded in the append-only audit log."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::health::liveness,
        crate::routes::health::readiness,
        crate::routes::ontology::list_entities,
        crate::routes::ontology::entity_schema,
        crate::routes::validate::validate_document,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::ontology::EntityList,
            crate::routes::validate::ValidationResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness and readiness checks"),
        (name = "ontology", description = "Registry entities and their JSON Schema exports"),
        (name = "validation", description = "Audited document validation"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates_successfully() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "CALD Ontology Validation API");
        assert_eq!(spec.info.version, "0.1.0");
    }

    #[test]
    fn test_openapi_spec_lists_routes() {
        let spec = ApiDoc::openapi();
        for path in [
            "/health/liveness",
            "/health/readiness",
            "/v1/ontology/entities",
            "/v1/ontology/entities/{entity_name}/schema",
            "/v1/validate/{entity_name}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_openapi_spec_has_tags() {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.expect("tags");
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["health", "ontology", "validation"]);
    }

    #[test]
    fn test_openapi_spec_serializes_to_json() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("ValidationResponse"));
    }
}

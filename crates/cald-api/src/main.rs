//! # cald-api: Binary Entry Point
//!
//! Loads the ontology registry, opens the audit log and starts the Axum
//! HTTP server. Binds to a configurable port (default 8080).

use std::sync::Arc;

use cald_api::state::{AppConfig, AppState};
use cald_audit::JsonlAuditSink;
use cald_schema::OntologyService;
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // A missing or inconsistent registry is fatal.
    let registry = cald_core::load_registry_path(&config.registry_path).map_err(|e| {
        tracing::error!(path = %config.registry_path.display(), "registry load failed: {e}");
        e
    })?;
    tracing::info!(
        path = %config.registry_path.display(),
        entities = registry.len(),
        "registry loaded"
    );

    let audit = Arc::new(JsonlAuditSink::new(config.audit_log.clone()));
    let service = Arc::new(OntologyService::new(
        Arc::new(registry),
        audit,
        config.service_config(),
    ));
    service.warm()?;

    let mut state = AppState::new(service, config.clone());
    if config.metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            tracing::error!("failed to install Prometheus recorder: {e}");
            e
        })?;
        state = state.with_metrics(handle);
    }

    let app = cald_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("CALD API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

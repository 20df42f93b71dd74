//! # Application State
//!
//! Shared state for the Axum application: the ontology service, the
//! server configuration, and the optional Prometheus handle.

use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use cald_schema::{OntologyService, ServiceConfig};

/// Server configuration, read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to (`PORT`).
    pub port: u16,
    /// Registry file (`CALD_REGISTRY`).
    pub registry_path: PathBuf,
    /// JSON-lines audit log (`CALD_AUDIT_LOG`).
    pub audit_log: PathBuf,
    /// Default audit actor (`CALD_ACTOR`).
    pub actor: String,
    /// Registry version stamped on successful audits (`CALD_SCHEMA_VERSION`).
    pub schema_version: String,
    /// Serve `/metrics` (`CALD_METRICS_ENABLED`, anything but "false").
    pub metrics_enabled: bool,
    /// Emit JSON log lines (`CALD_LOG_JSON=true`).
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            registry_path: PathBuf::from("ontology/registry_v1.yaml"),
            audit_log: PathBuf::from("output/logs/ontology_audit.jsonl"),
            actor: "validator".to_string(),
            schema_version: "registry_v1".to_string(),
            metrics_enabled: true,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup. Unset or
    /// unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            registry_path: lookup("CALD_REGISTRY")
                .map(PathBuf::from)
                .unwrap_or(defaults.registry_path),
            audit_log: lookup("CALD_AUDIT_LOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.audit_log),
            actor: lookup("CALD_ACTOR").unwrap_or(defaults.actor),
            schema_version: lookup("CALD_SCHEMA_VERSION").unwrap_or(defaults.schema_version),
            metrics_enabled: lookup("CALD_METRICS_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(defaults.metrics_enabled),
            log_json: lookup("CALD_LOG_JSON")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(defaults.log_json),
        }
    }

    /// Audit identity for the ontology service.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            actor: self.actor.clone(),
            role: "validator".to_string(),
            schema_version: self.schema_version.clone(),
        }
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OntologyService>,
    pub config: AppConfig,
    /// Present when a Prometheus recorder has been installed.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("config", &self.config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// Create application state without a metrics exporter.
    pub fn new(service: Arc<OntologyService>, config: AppConfig) -> Self {
        Self {
            service,
            config,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for the `/metrics` endpoint.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

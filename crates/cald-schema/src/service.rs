//! # Ontology Service
//!
//! The facade that entry points (HTTP, CLI) call. It owns the registry,
//! the schema cache and the audit sink.
//!
//! [`OntologyService::validate`] is the audited path: it hashes the raw
//! input before decoding, validates, and records exactly one
//! [`AuditEvent`] whatever the outcome. Panics raised while validating are
//! caught here and surface as [`ServiceError::Internal`]; a panicking audit
//! sink is logged and never reaches the caller.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use cald_audit::{AuditEvent, AuditSink, AuditStatus, VALIDATE_ENTITY_ACTION};
use cald_core::{sha256_hex, RegistrySpec};

use crate::compile::{CompiledSchema, SchemaCache};
use crate::error::SchemaError;
use crate::export::to_json_schema;
use crate::validate::{validate, ValidationResult};

/// Failure of an audited validation call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The entity is not declared in the registry.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// The input is not UTF-8 encoded JSON.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// An unexpected failure inside the service.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Audit status recorded for this failure.
    pub fn audit_status(&self) -> AuditStatus {
        match self {
            Self::UnknownEntity(_) | Self::MalformedInput(_) => AuditStatus::Error,
            Self::Internal(_) => AuditStatus::Exception,
        }
    }
}

impl From<SchemaError> for ServiceError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::UnknownEntity(name) => Self::UnknownEntity(name),
        }
    }
}

/// Identity stamped on audit events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Default actor, used when a call does not name one.
    pub actor: String,
    /// Role of this service in the audit trail.
    pub role: String,
    /// Registry version recorded on successful validations.
    pub schema_version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            actor: "validator".to_string(),
            role: "validator".to_string(),
            schema_version: "registry_v1".to_string(),
        }
    }
}

/// Registry-backed validation with auditing.
pub struct OntologyService {
    registry: Arc<RegistrySpec>,
    cache: SchemaCache,
    audit: Arc<dyn AuditSink>,
    config: ServiceConfig,
}

impl std::fmt::Debug for OntologyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OntologyService")
            .field("entities", &self.registry.len())
            .field("compiled", &self.cache.len())
            .field("config", &self.config)
            .finish()
    }
}

impl OntologyService {
    /// Create a service over a loaded registry.
    pub fn new(
        registry: Arc<RegistrySpec>,
        audit: Arc<dyn AuditSink>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            registry,
            cache: SchemaCache::new(),
            audit,
            config,
        }
    }

    /// The registry this service validates against.
    pub fn registry(&self) -> &RegistrySpec {
        &self.registry
    }

    /// Audit identity configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Entity names in declaration order.
    pub fn list_entities(&self) -> Vec<String> {
        self.registry
            .entity_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Compiled (cached) schema for `entity`.
    pub fn compile(&self, entity: &str) -> Result<CompiledSchema, SchemaError> {
        self.cache.get_or_compile(entity, &self.registry)
    }

    /// Compile every entity up front.
    pub fn warm(&self) -> Result<(), SchemaError> {
        for entity in self.registry.entities() {
            self.compile(&entity.name)?;
        }
        tracing::debug!(compiled = self.cache.len(), "schema cache warmed");
        Ok(())
    }

    /// JSON Schema export of `entity`.
    pub fn json_schema(&self, entity: &str) -> Result<Value, SchemaError> {
        Ok(to_json_schema(&self.compile(entity)?))
    }

    /// Validate an already-decoded document. Not audited.
    pub fn validate_value(
        &self,
        entity: &str,
        document: &Value,
    ) -> Result<ValidationResult, SchemaError> {
        Ok(validate(&self.compile(entity)?, document))
    }

    /// Validate raw bytes as `entity` on behalf of the configured actor.
    pub fn validate(&self, entity: &str, raw: &[u8]) -> Result<ValidationResult, ServiceError> {
        self.validate_as(&self.config.actor, entity, raw)
    }

    /// Validate raw bytes as `entity` on behalf of `actor`.
    ///
    /// Exactly one audit event is recorded per call. A failing audit sink
    /// is logged and does not change the result.
    pub fn validate_as(
        &self,
        actor: &str,
        entity: &str,
        raw: &[u8],
    ) -> Result<ValidationResult, ServiceError> {
        self.audited(actor, entity, raw, || self.decode_and_validate(entity, raw))
    }

    /// Run `validation` for a known `entity` under the panic guard and
    /// record its outcome against the hash of `raw`.
    fn audited<F>(
        &self,
        actor: &str,
        entity: &str,
        raw: &[u8],
        validation: F,
    ) -> Result<ValidationResult, ServiceError>
    where
        F: FnOnce() -> Result<ValidationResult, ServiceError>,
    {
        let content_hash = sha256_hex(raw);

        let outcome = if self.registry.contains(entity) {
            guarded(validation)
        } else {
            Err(ServiceError::UnknownEntity(entity.to_string()))
        };

        self.record(actor, entity, &content_hash, &outcome);
        outcome
    }

    fn decode_and_validate(
        &self,
        entity: &str,
        raw: &[u8],
    ) -> Result<ValidationResult, ServiceError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| ServiceError::MalformedInput(format!("input is not UTF-8: {e}")))?;
        let document: Value = serde_json::from_str(text)
            .map_err(|e| ServiceError::MalformedInput(format!("invalid JSON: {e}")))?;
        Ok(self.validate_value(entity, &document)?)
    }

    fn record(
        &self,
        actor: &str,
        entity: &str,
        content_hash: &str,
        outcome: &Result<ValidationResult, ServiceError>,
    ) {
        let status = match outcome {
            Ok(result) if result.ok => AuditStatus::Success,
            Ok(_) => AuditStatus::FailedValidation,
            Err(err) => err.audit_status(),
        };

        let event = AuditEvent::new(
            self.config.role.as_str(),
            actor,
            VALIDATE_ENTITY_ACTION,
            entity,
            status,
            content_hash,
        );
        let event = match outcome {
            Ok(result) if result.ok => event.with_schema_version(self.config.schema_version.as_str()),
            Ok(result) => event.with_errors(
                serde_json::to_value(&result.errors).unwrap_or(Value::Null),
            ),
            Err(err) => event.with_reason(err.to_string()),
        };

        match catch_unwind(AssertUnwindSafe(|| self.audit.record(&event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(
                entity,
                status = %status,
                error = %err,
                "failed to record audit event"
            ),
            Err(payload) => tracing::warn!(
                entity,
                status = %status,
                panic = %panic_message(payload),
                "audit sink panicked"
            ),
        }
        tracing::info!(entity, actor, status = %status, content_hash, "validation attempt");
    }
}

/// Turn a panic inside `validation` into [`ServiceError::Internal`].
fn guarded<F>(validation: F) -> Result<ValidationResult, ServiceError>
where
    F: FnOnce() -> Result<ValidationResult, ServiceError>,
{
    catch_unwind(AssertUnwindSafe(validation))
        .unwrap_or_else(|payload| Err(ServiceError::Internal(panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}

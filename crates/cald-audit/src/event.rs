//! # Audit Event
//!
//! The record written for every validation attempt, whatever its outcome.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action name recorded for entity validation attempts.
pub const VALIDATE_ENTITY_ACTION: &str = "validate_entity";

/// Outcome of the audited attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// The document satisfied the entity schema.
    Success,
    /// The document was decoded and checked but violated the schema.
    FailedValidation,
    /// The request could not be served (unknown entity, malformed input).
    Error,
    /// An unexpected failure was caught at the service boundary.
    Exception,
}

impl AuditStatus {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::FailedValidation => "failed_validation",
            Self::Error => "error",
            Self::Exception => "exception",
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit trail record.
///
/// `content_hash` is the SHA-256 of the raw submitted bytes, computed
/// before decoding, so it is present for every status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// UTC time of the attempt, truncated to seconds.
    pub timestamp: DateTime<Utc>,
    /// Unique id of this record.
    pub event_id: Uuid,
    /// Role of the recording component.
    pub role: String,
    /// Who requested the attempt.
    pub actor: String,
    /// What was attempted.
    pub action: String,
    /// Entity the document was validated against.
    pub entity: String,
    /// Outcome.
    pub status: AuditStatus,
    /// Lowercase hex SHA-256 of the raw input.
    pub content_hash: String,
    /// Registry version the document was checked against (success only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Structured validation errors (failed validation only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
    /// Failure reason (error and exception only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEvent {
    /// Create an event stamped with the current time and a fresh id.
    pub fn new(
        role: impl Into<String>,
        actor: impl Into<String>,
        action: impl Into<String>,
        entity: impl Into<String>,
        status: AuditStatus,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().trunc_subsecs(0),
            event_id: Uuid::new_v4(),
            role: role.into(),
            actor: actor.into(),
            action: action.into(),
            entity: entity.into(),
            status,
            content_hash: content_hash.into(),
            schema_version: None,
            errors: None,
            reason: None,
        }
    }

    /// Attach the registry version.
    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = Some(version.into());
        self
    }

    /// Attach structured validation errors.
    pub fn with_errors(mut self, errors: serde_json::Value) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Attach a failure reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: AuditStatus) -> AuditEvent {
        AuditEvent::new(
            "validator",
            "intake-service",
            VALIDATE_ENTITY_ACTION,
            "Patient",
            status,
            "ab".repeat(32),
        )
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_value(AuditStatus::FailedValidation).unwrap();
        assert_eq!(json, "failed_validation");
        assert_eq!(AuditStatus::Exception.to_string(), "exception");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let json = serde_json::to_value(sample(AuditStatus::Error)).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("schema_version"));
        assert!(!obj.contains_key("errors"));
        assert!(!obj.contains_key("reason"));
        assert_eq!(obj["action"], "validate_entity");
        assert_eq!(obj["status"], "error");
    }

    #[test]
    fn test_timestamp_has_no_subseconds() {
        let json = serde_json::to_value(sample(AuditStatus::Success)).unwrap();
        let ts = json["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z'), "timestamp {ts} should be UTC with Z suffix");
        assert!(!ts.contains('.'), "timestamp {ts} should be truncated to seconds");
    }

    #[test]
    fn test_builders_attach_payloads() {
        let event = sample(AuditStatus::FailedValidation)
            .with_errors(serde_json::json!([{"path": ["patient_name"]}]))
            .with_schema_version("registry_v1")
            .with_reason("unused");
        assert_eq!(event.schema_version.as_deref(), Some("registry_v1"));
        assert!(event.errors.is_some());
        assert_eq!(event.reason.as_deref(), Some("unused"));
    }

    #[test]
    fn test_event_ids_are_unique() {
        assert_ne!(
            sample(AuditStatus::Success).event_id,
            sample(AuditStatus::Success).event_id
        );
    }
}

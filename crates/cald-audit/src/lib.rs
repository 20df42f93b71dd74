//! # cald-audit: Validation Audit Trail
//!
//! Records one [`AuditEvent`] per validation attempt. The trail is a
//! one-way, append-only collaborator: the ontology service writes to an
//! [`AuditSink`] and never reads back from it.
//!
//! ## Sinks
//!
//! - [`JsonlAuditSink`]: appends one JSON object per line to a file,
//!   creating parent directories on first write.
//! - [`MemoryAuditSink`]: bounded in-memory trail for tests and embedding.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cald-*` crates; error payloads are carried
//!   as opaque JSON.
//! - A failing sink reports `AuditError`; callers decide whether that is
//!   fatal (the ontology service logs it and carries on).

pub mod event;
pub mod sink;

pub use event::{AuditEvent, AuditStatus, VALIDATE_ENTITY_ACTION};
pub use sink::{AuditError, AuditSink, JsonlAuditSink, MemoryAuditSink};

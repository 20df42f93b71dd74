//! # cald-schema: Schema Compilation & Validation
//!
//! Turns a loaded [`cald_core::RegistrySpec`] into runtime validation.
//!
//! ## Pipeline
//!
//! ```text
//! RegistrySpec ──compile──▶ CompiledSchema (cached) ──validate(document)──▶ ValidationResult
//!                     ▲
//!      multi-entity document ──extract(entity)──┘ (projection before validate)
//! ```
//!
//! - [`compile`]: builds an explicit [`Schema`] value per entity, memoized
//!   in a [`SchemaCache`]. Entities live in an arena indexed by
//!   [`EntityId`]; a placeholder is reserved before an entity's fields are
//!   compiled, so self- and mutually-referential registries terminate.
//! - [`validate()`](validate::validate): walks a JSON document against a
//!   compiled schema and reports *every* violation with its field path.
//! - [`extract`]: projects one entity's declared fields out of a flat
//!   document that carries several entities.
//! - [`to_json_schema`]: exports a compiled schema as JSON Schema.
//! - [`OntologyService`]: the facade the HTTP layer and CLI call: hashes
//!   raw input, validates, and records exactly one audit event per attempt.
//!
//! ## Crate Policy
//!
//! - Depends on `cald-core` and `cald-audit` only.
//! - Nothing reachable from [`OntologyService::validate`] may take the
//!   process down; every failure becomes a [`ServiceError`].

pub mod compile;
pub mod error;
pub mod export;
pub mod extract;
pub mod service;
pub mod validate;

pub use compile::{
    compile, CompiledSchema, EntityId, EntitySchema, FieldSchema, Schema, SchemaArena, SchemaCache,
};
pub use error::SchemaError;
pub use export::to_json_schema;
pub use extract::extract;
pub use service::{OntologyService, ServiceConfig, ServiceError};
pub use validate::{json_type_name, IssueKind, PathSegment, ValidationIssue, ValidationResult};

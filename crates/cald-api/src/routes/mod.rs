//! # API Route Modules
//!
//! - `health`: liveness and readiness checks.
//! - `ontology`: entity listing and JSON Schema export.
//! - `validate`: audited single-entity document validation.

pub mod health;
pub mod ontology;
pub mod validate;

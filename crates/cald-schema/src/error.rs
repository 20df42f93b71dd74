//! Errors raised while compiling or projecting against a registry.

use thiserror::Error;

/// Compilation or projection failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The named entity is not declared in the registry.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
}

//! # Error Types: Registry Consistency Failures
//!
//! `SpecError` is raised only while loading a registry. Every variant names
//! the entity (and field or relation where applicable) that broke the rule,
//! so a registry author can fix the source without re-running anything.

use thiserror::Error;

/// The registry is inconsistent and must not be served.
#[derive(Error, Debug)]
pub enum SpecError {
    /// The registry source could not be read.
    #[error("cannot read registry '{path}': {source}")]
    Io {
        /// Path of the registry file.
        path: String,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// The registry source is not well-formed YAML/JSON or does not have
    /// the expected shape.
    #[error("registry parse error: {0}")]
    Parse(String),

    /// The same key appears twice in one mapping.
    #[error("duplicate key '{key}' in {scope}")]
    DuplicateKey {
        /// Where the duplicate was found (e.g. "entities", "fields of Patient").
        scope: String,
        /// The repeated key.
        key: String,
    },

    /// A field declares a `type` outside the supported set.
    #[error("entity '{entity}' field '{field}': unknown type '{kind}'")]
    UnknownFieldType {
        /// Owning entity.
        entity: String,
        /// Offending field.
        field: String,
        /// The declared type.
        kind: String,
    },

    /// `type: array` without `items`.
    #[error("entity '{entity}' field '{field}': array fields must define 'items'")]
    ArrayWithoutItems {
        /// Owning entity.
        entity: String,
        /// Offending field.
        field: String,
    },

    /// `items` on a field whose type is not `array`.
    #[error("entity '{entity}' field '{field}': only fields of type 'array' can have 'items' (type is '{kind}')")]
    ItemsOnScalar {
        /// Owning entity.
        entity: String,
        /// Offending field.
        field: String,
        /// The declared (non-array) type.
        kind: String,
    },

    /// `items` names neither a scalar kind nor an entity in the registry.
    #[error("entity '{entity}' field '{field}': items '{items}' is neither a scalar type nor a known entity")]
    UnknownItemType {
        /// Owning entity.
        entity: String,
        /// Offending field.
        field: String,
        /// The declared item type.
        items: String,
    },

    /// `items: array`: arrays of arrays are not supported.
    #[error("entity '{entity}' field '{field}': nested arrays are not supported")]
    NestedArray {
        /// Owning entity.
        entity: String,
        /// Offending field.
        field: String,
    },

    /// A relation targets an entity that is not declared.
    #[error("entity '{entity}' relation '{relation}': target '{target}' is not a known entity")]
    DanglingRelation {
        /// Owning entity.
        entity: String,
        /// Offending relation.
        relation: String,
        /// The missing target entity.
        target: String,
    },

    /// An entity name collides with a scalar type name, making `items`
    /// references to it ambiguous.
    #[error("entity name '{entity}' shadows a scalar type")]
    ReservedEntityName {
        /// The offending entity name.
        entity: String,
    },
}

impl From<serde_yaml::Error> for SpecError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

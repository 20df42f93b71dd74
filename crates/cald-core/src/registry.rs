//! # Registry Model
//!
//! The typed, validated form of the entity registry. Values of these types
//! are only produced by the loader (see [`crate::loader`]) and are immutable
//! afterwards; the compiler and validator share a `RegistrySpec` read-only.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A non-array field kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// Free text.
    String,
    /// A calendar date, carried as text.
    Date,
    /// Any JSON number.
    Decimal,
    /// A JSON number without a fractional part.
    Integer,
    /// `true` / `false`.
    Boolean,
}

impl ScalarKind {
    /// Every scalar kind, in declaration order.
    pub const ALL: [ScalarKind; 5] = [
        Self::String,
        Self::Date,
        Self::Decimal,
        Self::Integer,
        Self::Boolean,
    ];

    /// Returns the registry spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Date => "date",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    /// Parse a registry type name. Returns `None` for `array` and for
    /// anything unknown.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element type of an array field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Array of primitives.
    Scalar(ScalarKind),
    /// Array of nested entity records, by entity name.
    Entity(String),
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Entity(name) => f.write_str(name),
        }
    }
}

/// The declared type of a field.
///
/// `items` exists exactly when the field is an array; this enum is how that
/// invariant is kept after loading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A single scalar value.
    Scalar(ScalarKind),
    /// A sequence of items.
    Array(ItemType),
}

impl FieldType {
    /// Whether this is an array field.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// The entity an array field nests, if any.
    pub fn nested_entity(&self) -> Option<&str> {
        match self {
            Self::Array(ItemType::Entity(name)) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Array(items) => write!(f, "array<{items}>"),
        }
    }
}

/// One declared field of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within the entity.
    pub name: String,
    /// Declared type.
    pub field_type: FieldType,
    /// Absence is an error when true.
    pub required: bool,
    /// Marks personal or otherwise sensitive data. Informational.
    pub sensitive: bool,
}

/// How many targets a relation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// Exactly one target.
    One,
    /// Any number of targets.
    Many,
}

impl Cardinality {
    /// Returns the registry spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Many => "many",
        }
    }
}

/// A named, directed relation from one entity to another.
///
/// Relations are descriptive: the validator does not enforce them. They
/// drive the graph export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSpec {
    /// Relation name, unique within the entity.
    pub name: String,
    /// Target entity name; guaranteed to exist in the registry.
    pub target: String,
    /// Declared cardinality.
    pub cardinality: Cardinality,
}

/// A named record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpec {
    /// Entity name, unique within the registry.
    pub name: String,
    /// Declared fields in source order.
    pub fields: Vec<FieldSpec>,
    /// Declared relations in source order.
    pub relations: Vec<RelationSpec>,
}

impl EntitySpec {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the required fields, in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }
}

/// The loaded entity registry.
///
/// Immutable once built. Share it behind an `Arc` between the compiler,
/// the validator, and any batch tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySpec {
    entities: Vec<EntitySpec>,
    index: HashMap<String, usize>,
}

impl RegistrySpec {
    /// Build a registry from already-validated entities.
    ///
    /// Only the loader calls this; it has checked names for uniqueness.
    pub(crate) fn from_entities(entities: Vec<EntitySpec>) -> Self {
        let index = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        Self { entities, index }
    }

    /// Look up an entity by name.
    pub fn entity(&self, name: &str) -> Option<&EntitySpec> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    /// Whether the registry declares `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All entities in declaration order.
    pub fn entities(&self) -> &[EntitySpec] {
        &self.entities
    }

    /// Entity names in declaration order.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    /// Number of declared entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry declares no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

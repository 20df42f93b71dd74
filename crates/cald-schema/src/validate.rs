//! # Document Validation
//!
//! Walks a JSON document against a [`CompiledSchema`] and collects every
//! violation instead of stopping at the first.
//!
//! ## Rules
//!
//! - Absent or `null` required field → `missing_required`.
//! - Absent or `null` optional field → filled with its default (`null`, or
//!   `[]` for lists).
//! - `string` and `date` accept JSON strings; `decimal` accepts any number;
//!   `integer` accepts numbers without a fractional part; `boolean` accepts
//!   booleans. Anything else → `type_mismatch`.
//! - Entity positions (the root and nested list elements) must be objects.
//! - Keys the entity does not declare are dropped from the normalized value.
//!
//! Errors for list elements carry the element index in their path, so a
//! list with N malformed elements yields N errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use cald_core::ScalarKind;

use crate::compile::{CompiledSchema, EntityId, Schema, SchemaArena};

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// An object key.
    Field(String),
    /// A list position.
    Index(usize),
}

/// Category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A required field is absent or null.
    MissingRequired,
    /// A value has the wrong JSON type.
    TypeMismatch,
}

/// A single violation, located by its field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Path from the document root; empty for the root itself.
    pub path: Vec<PathSegment>,
    /// Issue category.
    pub kind: IssueKind,
    /// Human-readable description.
    pub detail: String,
    /// Expected type, for mismatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Observed JSON type, for mismatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<String>,
}

impl ValidationIssue {
    /// Dotted rendering of the path, e.g. `line_items[2]`. The root renders
    /// as `(root)`.
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            return "(root)".to_string();
        }
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path_string(), self.detail)
    }
}

/// Outcome of validating one document.
///
/// `value` is the normalized document (defaults filled, undeclared keys
/// dropped) and is present exactly when `ok` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the document satisfied the schema.
    pub ok: bool,
    /// Every violation found; empty when `ok`.
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    /// The normalized document, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Name of a JSON value's type as reported in `observed`.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate `document` against `schema`, collecting all violations.
pub fn validate(schema: &CompiledSchema, document: &Value) -> ValidationResult {
    let mut walker = Walker {
        arena: schema.arena(),
        path: Vec::new(),
        errors: Vec::new(),
    };
    let normalized = walker.entity(schema.root_id(), document);
    let ok = walker.errors.is_empty();
    ValidationResult {
        ok,
        errors: walker.errors,
        value: ok.then_some(normalized),
    }
}

fn matches_kind(kind: ScalarKind, value: &Value) -> bool {
    match kind {
        ScalarKind::String | ScalarKind::Date => value.is_string(),
        ScalarKind::Decimal => value.is_number(),
        ScalarKind::Integer => match value {
            Value::Number(n) => {
                n.is_i64()
                    || n.is_u64()
                    || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
            }
            _ => false,
        },
        ScalarKind::Boolean => value.is_boolean(),
    }
}

struct Walker<'a> {
    arena: &'a SchemaArena,
    path: Vec<PathSegment>,
    errors: Vec<ValidationIssue>,
}

impl<'a> Walker<'a> {
    fn entity(&mut self, id: EntityId, value: &Value) -> Value {
        let Some(object) = value.as_object() else {
            self.mismatch("object", value);
            return Value::Null;
        };
        let arena = self.arena;
        let entity = arena.entity(id);

        let mut out = Map::new();
        for field in &entity.fields {
            self.path.push(PathSegment::Field(field.name.clone()));
            let normalized = self.field(&field.schema, object.get(&field.name));
            self.path.pop();
            out.insert(field.name.clone(), normalized);
        }
        Value::Object(out)
    }

    fn field(&mut self, schema: &Schema, value: Option<&Value>) -> Value {
        let present = value.filter(|v| !v.is_null());
        match (schema, present) {
            (Schema::Optional(_), None) => schema.default_value().unwrap_or(Value::Null),
            (Schema::Optional(inner), Some(v)) => self.field(inner, Some(v)),
            (_, None) => {
                self.missing();
                Value::Null
            }
            (Schema::Scalar(kind), Some(v)) => self.scalar(*kind, v),
            (Schema::ListOfScalar(kind), Some(v)) => {
                let Some(items) = v.as_array() else {
                    self.mismatch("array", v);
                    return Value::Null;
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    self.path.push(PathSegment::Index(i));
                    out.push(self.scalar(*kind, item));
                    self.path.pop();
                }
                Value::Array(out)
            }
            (Schema::ListOfEntity { id, .. }, Some(v)) => {
                let Some(items) = v.as_array() else {
                    self.mismatch("array", v);
                    return Value::Null;
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    self.path.push(PathSegment::Index(i));
                    out.push(self.entity(*id, item));
                    self.path.pop();
                }
                Value::Array(out)
            }
        }
    }

    fn scalar(&mut self, kind: ScalarKind, value: &Value) -> Value {
        if matches_kind(kind, value) {
            value.clone()
        } else {
            self.mismatch(kind.as_str(), value);
            Value::Null
        }
    }

    fn missing(&mut self) {
        self.errors.push(ValidationIssue {
            path: self.path.clone(),
            kind: IssueKind::MissingRequired,
            detail: "field required".to_string(),
            expected: None,
            observed: None,
        });
    }

    fn mismatch(&mut self, expected: &str, value: &Value) {
        let observed = json_type_name(value);
        self.errors.push(ValidationIssue {
            path: self.path.clone(),
            kind: IssueKind::TypeMismatch,
            detail: format!("expected {expected}, found {observed}"),
            expected: Some(expected.to_string()),
            observed: Some(observed.to_string()),
        });
    }
}

//! # Registry Loader
//!
//! Parses registry source text (YAML, or JSON as its subset) into a
//! [`RegistrySpec`], enforcing every consistency rule on the way:
//!
//! - `type` must be one of `string | date | decimal | integer | boolean | array`.
//! - `type: array` must carry `items`; any other type must not.
//! - `items` must name a scalar type or a declared entity (never `array`).
//! - Relation targets must be declared entities.
//! - Keys are unique within every mapping; entity names may not shadow a
//!   scalar type name.
//!
//! Any violation is a [`SpecError`]. A registry that fails here is never
//! handed to the compiler.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::SpecError;
use crate::registry::{
    Cardinality, EntitySpec, FieldSpec, FieldType, ItemType, RegistrySpec, RelationSpec,
    ScalarKind,
};

const ARRAY_TYPE: &str = "array";

/// Load and validate a registry from a file.
///
/// # Errors
///
/// Returns `SpecError::Io` if the file cannot be read, and any other
/// `SpecError` variant if the content is inconsistent.
pub fn load_registry_path(path: impl AsRef<Path>) -> Result<RegistrySpec, SpecError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let registry = load_registry_str(&source)?;
    tracing::info!(
        path = %path.display(),
        entities = registry.len(),
        "registry loaded"
    );
    Ok(registry)
}

/// Load and validate a registry from source text.
///
/// # Errors
///
/// Returns `SpecError::Parse` for malformed text and the specific
/// consistency variant for any rule violation.
pub fn load_registry_str(source: &str) -> Result<RegistrySpec, SpecError> {
    let raw: RawRegistry = serde_yaml::from_str(source)?;
    build_registry(raw)
}

// ---------------------------------------------------------------------------
// Raw (unvalidated) shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRegistry {
    entities: OrderedEntries<RawEntity>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    fields: OrderedEntries<RawField>,
    #[serde(default)]
    relations: OrderedEntries<RawRelation>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    sensitive: bool,
    #[serde(default)]
    items: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRelation {
    target: String,
    cardinality: Cardinality,
}

/// Mapping entries in source order, duplicates included.
///
/// Deserializing into a `HashMap` would silently keep the last duplicate;
/// keeping every entry lets the loader report it instead.
#[derive(Debug)]
struct OrderedEntries<V>(Vec<(String, V)>);

impl<V> Default for OrderedEntries<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedEntries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = OrderedEntries<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(OrderedEntries::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(OrderedEntries::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn build_registry(raw: RawRegistry) -> Result<RegistrySpec, SpecError> {
    check_unique(&raw.entities, "entities")?;

    for (name, _) in &raw.entities.0 {
        if name == ARRAY_TYPE || ScalarKind::parse(name).is_some() {
            return Err(SpecError::ReservedEntityName {
                entity: name.clone(),
            });
        }
    }

    let known: HashSet<&str> = raw.entities.0.iter().map(|(n, _)| n.as_str()).collect();

    let mut entities = Vec::with_capacity(raw.entities.0.len());
    for (entity_name, raw_entity) in &raw.entities.0 {
        entities.push(build_entity(entity_name, raw_entity, &known)?);
    }

    Ok(RegistrySpec::from_entities(entities))
}

fn build_entity(
    entity: &str,
    raw: &RawEntity,
    known: &HashSet<&str>,
) -> Result<EntitySpec, SpecError> {
    check_unique(&raw.fields, &format!("fields of {entity}"))?;
    check_unique(&raw.relations, &format!("relations of {entity}"))?;

    let fields = raw
        .fields
        .0
        .iter()
        .map(|(name, field)| build_field(entity, name, field, known))
        .collect::<Result<Vec<_>, _>>()?;

    let relations = raw
        .relations
        .0
        .iter()
        .map(|(name, relation)| {
            if !known.contains(relation.target.as_str()) {
                return Err(SpecError::DanglingRelation {
                    entity: entity.to_string(),
                    relation: name.clone(),
                    target: relation.target.clone(),
                });
            }
            Ok(RelationSpec {
                name: name.clone(),
                target: relation.target.clone(),
                cardinality: relation.cardinality,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EntitySpec {
        name: entity.to_string(),
        fields,
        relations,
    })
}

fn build_field(
    entity: &str,
    name: &str,
    raw: &RawField,
    known: &HashSet<&str>,
) -> Result<FieldSpec, SpecError> {
    let field_type = if raw.kind == ARRAY_TYPE {
        let items = raw.items.as_deref().ok_or_else(|| SpecError::ArrayWithoutItems {
            entity: entity.to_string(),
            field: name.to_string(),
        })?;
        FieldType::Array(resolve_items(entity, name, items, known)?)
    } else {
        let kind = ScalarKind::parse(&raw.kind).ok_or_else(|| SpecError::UnknownFieldType {
            entity: entity.to_string(),
            field: name.to_string(),
            kind: raw.kind.clone(),
        })?;
        if raw.items.is_some() {
            return Err(SpecError::ItemsOnScalar {
                entity: entity.to_string(),
                field: name.to_string(),
                kind: raw.kind.clone(),
            });
        }
        FieldType::Scalar(kind)
    };

    Ok(FieldSpec {
        name: name.to_string(),
        field_type,
        required: raw.required,
        sensitive: raw.sensitive,
    })
}

fn resolve_items(
    entity: &str,
    field: &str,
    items: &str,
    known: &HashSet<&str>,
) -> Result<ItemType, SpecError> {
    if items == ARRAY_TYPE {
        return Err(SpecError::NestedArray {
            entity: entity.to_string(),
            field: field.to_string(),
        });
    }
    if let Some(kind) = ScalarKind::parse(items) {
        return Ok(ItemType::Scalar(kind));
    }
    if known.contains(items) {
        return Ok(ItemType::Entity(items.to_string()));
    }
    Err(SpecError::UnknownItemType {
        entity: entity.to_string(),
        field: field.to_string(),
        items: items.to_string(),
    })
}

fn check_unique<V>(entries: &OrderedEntries<V>, scope: &str) -> Result<(), SpecError> {
    let mut seen = HashSet::with_capacity(entries.0.len());
    for (key, _) in &entries.0 {
        if !seen.insert(key.as_str()) {
            return Err(SpecError::DuplicateKey {
                scope: scope.to_string(),
                key: key.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATIENT: &str = r#"
entities:
  Patient:
    fields:
      patient_name: {type: string, required: true, sensitive: true}
      patient_dob: {type: date}
      patient_id: {type: string}
"#;

    #[test]
    fn test_load_minimal_registry() {
        let registry = load_registry_str(PATIENT).unwrap();
        assert_eq!(registry.entity_names(), vec!["Patient"]);
        let patient = registry.entity("Patient").unwrap();
        let names: Vec<&str> = patient.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["patient_name", "patient_dob", "patient_id"]);

        let name = patient.field("patient_name").unwrap();
        assert!(name.required);
        assert!(name.sensitive);
        assert_eq!(name.field_type, FieldType::Scalar(ScalarKind::String));

        let dob = patient.field("patient_dob").unwrap();
        assert!(!dob.required);
        assert!(!dob.sensitive);
        assert!(patient.relations.is_empty());
    }

    #[test]
    fn test_load_json_source() {
        let json = r#"{"entities": {"Tag": {"fields": {"label": {"type": "string"}}}}}"#;
        let registry = load_registry_str(json).unwrap();
        assert!(registry.contains("Tag"));
    }

    #[test]
    fn test_items_on_scalar_rejected() {
        let src = r#"
entities:
  Claim:
    fields:
      invoice_number: {type: string, items: string}
"#;
        let err = load_registry_str(src).unwrap_err();
        match err {
            SpecError::ItemsOnScalar { entity, field, kind } => {
                assert_eq!(entity, "Claim");
                assert_eq!(field, "invoice_number");
                assert_eq!(kind, "string");
            }
            other => panic!("Expected ItemsOnScalar, got: {other}"),
        }
    }

    #[test]
    fn test_array_without_items_rejected() {
        let src = r#"
entities:
  Claim:
    fields:
      line_items: {type: array, required: true}
"#;
        let err = load_registry_str(src).unwrap_err();
        assert!(
            matches!(err, SpecError::ArrayWithoutItems { ref entity, ref field }
                if entity == "Claim" && field == "line_items"),
            "got: {err}"
        );
    }

    #[test]
    fn test_unknown_items_rejected() {
        let src = r#"
entities:
  Claim:
    fields:
      line_items: {type: array, items: LineItem}
"#;
        let err = load_registry_str(src).unwrap_err();
        assert!(
            matches!(err, SpecError::UnknownItemType { ref items, .. } if items == "LineItem"),
            "got: {err}"
        );
    }

    #[test]
    fn test_nested_array_rejected() {
        let src = r#"
entities:
  Grid:
    fields:
      rows: {type: array, items: array}
"#;
        let err = load_registry_str(src).unwrap_err();
        assert!(matches!(err, SpecError::NestedArray { .. }), "got: {err}");
    }

    #[test]
    fn test_unknown_field_type_rejected() {
        let src = r#"
entities:
  Patient:
    fields:
      age: {type: number}
"#;
        let err = load_registry_str(src).unwrap_err();
        assert!(
            matches!(err, SpecError::UnknownFieldType { ref kind, .. } if kind == "number"),
            "got: {err}"
        );
    }

    #[test]
    fn test_dangling_relation_rejected() {
        let src = r#"
entities:
  Patient:
    fields:
      patient_name: {type: string}
    relations:
      has_encounter: {target: Encounter, cardinality: many}
"#;
        let err = load_registry_str(src).unwrap_err();
        match err {
            SpecError::DanglingRelation {
                entity,
                relation,
                target,
            } => {
                assert_eq!(entity, "Patient");
                assert_eq!(relation, "has_encounter");
                assert_eq!(target, "Encounter");
            }
            other => panic!("Expected DanglingRelation, got: {other}"),
        }
    }

    #[test]
    fn test_bad_cardinality_is_parse_error() {
        let src = r#"
entities:
  A:
    fields: {}
    relations:
      to_a: {target: A, cardinality: several}
"#;
        let err = load_registry_str(src).unwrap_err();
        assert!(matches!(err, SpecError::Parse(_)), "got: {err}");
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let src = r#"
entities:
  Patient:
    fields:
      patient_name: {type: string}
      patient_name: {type: date}
"#;
        let err = load_registry_str(src).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "got: {err}");
    }

    #[test]
    fn test_reserved_entity_name_rejected() {
        let src = r#"
entities:
  string:
    fields: {}
"#;
        let err = load_registry_str(src).unwrap_err();
        assert!(matches!(err, SpecError::ReservedEntityName { .. }), "got: {err}");
    }

    #[test]
    fn test_entity_items_and_self_reference_resolve() {
        let src = r#"
entities:
  Category:
    fields:
      label: {type: string, required: true}
      children: {type: array, items: Category}
    relations:
      parent: {target: Category, cardinality: one}
"#;
        let registry = load_registry_str(src).unwrap();
        let category = registry.entity("Category").unwrap();
        assert_eq!(
            category.field("children").unwrap().field_type,
            FieldType::Array(ItemType::Entity("Category".into()))
        );
        assert_eq!(category.relations[0].cardinality, Cardinality::One);
    }

    #[test]
    fn test_missing_fields_key_is_parse_error() {
        let src = r#"
entities:
  Patient:
    relations: {}
"#;
        let err = load_registry_str(src).unwrap_err();
        assert!(matches!(err, SpecError::Parse(_)), "got: {err}");
    }

    #[test]
    fn test_load_path_missing_file() {
        let err = load_registry_path("/nonexistent/registry.yaml").unwrap_err();
        assert!(matches!(err, SpecError::Io { .. }), "got: {err}");
    }
}

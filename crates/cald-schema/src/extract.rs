//! Entity projection for multi-entity documents.
//!
//! Ground-truth files carry the fields of several entities side by side.
//! [`extract`] picks out one entity's declared fields so the result can be
//! validated against that entity alone.

use serde_json::{Map, Value};

use cald_core::{EntitySpec, RegistrySpec};

use crate::error::SchemaError;

/// Project `document` onto the declared fields of `entity_name`.
///
/// Absent fields become `null`, or `[]` for arrays. Arrays of nested
/// entities are projected element-wise. Values of the wrong shape are
/// passed through untouched so validation can report them.
pub fn extract(
    document: &Value,
    entity_name: &str,
    registry: &RegistrySpec,
) -> Result<Value, SchemaError> {
    let entity = registry
        .entity(entity_name)
        .ok_or_else(|| SchemaError::UnknownEntity(entity_name.to_string()))?;
    Ok(project(document, entity, registry))
}

fn project(document: &Value, entity: &EntitySpec, registry: &RegistrySpec) -> Value {
    let Some(object) = document.as_object() else {
        return document.clone();
    };

    let mut out = Map::new();
    for field in &entity.fields {
        let projected = match object.get(&field.name) {
            None if field.field_type.is_array() => Value::Array(Vec::new()),
            None => Value::Null,
            Some(Value::Array(items)) => {
                match field.field_type.nested_entity().and_then(|n| registry.entity(n)) {
                    Some(nested) => Value::Array(
                        items
                            .iter()
                            .map(|item| project(item, nested, registry))
                            .collect(),
                    ),
                    None => Value::Array(items.clone()),
                }
            }
            Some(other) => other.clone(),
        };
        out.insert(field.name.clone(), projected);
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cald_core::load_registry_str;
    use serde_json::json;

    fn registry() -> RegistrySpec {
        load_registry_str(include_str!("../../../ontology/registry_v1.yaml")).unwrap()
    }

    #[test]
    fn test_extract_picks_declared_fields() {
        let doc = json!({
            "patient_name": "Ana",
            "provider_name": "Clinic",
            "total_amount": 10
        });
        let patient = extract(&doc, "Patient", &registry()).unwrap();
        assert_eq!(
            patient,
            json!({ "patient_name": "Ana", "patient_dob": null, "patient_id": null })
        );
    }

    #[test]
    fn test_extract_defaults_arrays_to_empty() {
        let claim = extract(&json!({ "total_amount": 3 }), "Claim", &registry()).unwrap();
        assert_eq!(claim["line_items"], json!([]));
        assert_eq!(claim["invoice_number"], Value::Null);
    }

    #[test]
    fn test_extract_keeps_malformed_values() {
        let claim = extract(&json!({ "line_items": "x" }), "Claim", &registry()).unwrap();
        assert_eq!(claim["line_items"], json!("x"));
    }

    #[test]
    fn test_extract_recurses_into_nested_entities() {
        let registry = load_registry_str(
            r#"
entities:
  Order:
    fields:
      lines: { type: array, items: Line }
  Line:
    fields:
      sku: { type: string }
"#,
        )
        .unwrap();
        let doc = json!({ "lines": [{ "sku": "a", "noise": 1 }, {}, 7] });
        let order = extract(&doc, "Order", &registry).unwrap();
        assert_eq!(
            order,
            json!({ "lines": [{ "sku": "a" }, { "sku": null }, 7] })
        );
    }

    #[test]
    fn test_extract_unknown_entity() {
        let err = extract(&json!({}), "Invoice", &registry()).unwrap_err();
        assert_eq!(err, SchemaError::UnknownEntity("Invoice".into()));
    }

    #[test]
    fn test_extract_non_object_passthrough() {
        let out = extract(&json!([1]), "Patient", &registry()).unwrap();
        assert_eq!(out, json!([1]));
    }
}

//! Integration test: the shipped `ontology/registry_v1.yaml` loads cleanly
//! and has the expected shape.

use std::path::PathBuf;

use cald_core::{load_registry_path, load_registry_str, Cardinality, FieldType, ItemType, ScalarKind, SpecError};
use proptest::prelude::*;

/// Find the repository root.
fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

#[test]
fn test_shipped_registry_loads() {
    let registry = load_registry_path(repo_root().join("ontology/registry_v1.yaml")).unwrap();
    assert_eq!(
        registry.entity_names(),
        vec!["Patient", "Encounter", "Claim", "Consent"]
    );

    let claim = registry.entity("Claim").unwrap();
    assert_eq!(
        claim.field("line_items").unwrap().field_type,
        FieldType::Array(ItemType::Scalar(ScalarKind::String))
    );
    assert_eq!(claim.required_fields().collect::<Vec<_>>(), vec!["total_amount", "line_items"]);

    let patient = registry.entity("Patient").unwrap();
    let targets: Vec<(&str, Cardinality)> = patient
        .relations
        .iter()
        .map(|r| (r.target.as_str(), r.cardinality))
        .collect();
    assert_eq!(
        targets,
        vec![("Encounter", Cardinality::Many), ("Consent", Cardinality::Many)]
    );
}

#[test]
fn test_registry_from_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.yaml");
    std::fs::write(
        &path,
        "entities:\n  Note:\n    fields:\n      body: {type: string, required: true}\n",
    )
    .unwrap();
    let registry = load_registry_path(&path).unwrap();
    assert_eq!(registry.entity_names(), vec!["Note"]);
}

fn scalar_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["string", "date", "decimal", "integer", "boolean"])
}

proptest! {
    /// Any non-array field that declares `items` is rejected, whatever the
    /// declared kind and item type.
    #[test]
    fn prop_items_on_non_array_always_rejected(kind in scalar_name(), items in scalar_name()) {
        let src = format!(
            "entities:\n  E:\n    fields:\n      f: {{type: {kind}, items: {items}}}\n"
        );
        let err = load_registry_str(&src).unwrap_err();
        let is_items_on_scalar = matches!(err, SpecError::ItemsOnScalar { .. });
        prop_assert!(is_items_on_scalar);
    }

    /// Arrays of any scalar kind load and keep that kind.
    #[test]
    fn prop_scalar_arrays_load(items in scalar_name()) {
        let src = format!(
            "entities:\n  E:\n    fields:\n      f: {{type: array, items: {items}}}\n"
        );
        let registry = load_registry_str(&src).unwrap();
        let field = registry.entity("E").unwrap().field("f").unwrap();
        let expected = FieldType::Array(ItemType::Scalar(ScalarKind::parse(items).unwrap()));
        prop_assert_eq!(&field.field_type, &expected);
    }
}

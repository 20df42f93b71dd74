//! # JSON Schema Export
//!
//! Renders a [`CompiledSchema`] as a JSON Schema (draft 2020-12) document.
//! Nested entities are emitted once under `$defs` and referenced with
//! `$ref`; a reference back to the root entity uses `"#"`, so cyclic
//! registries export finitely.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use cald_core::ScalarKind;

use crate::compile::{CompiledSchema, EntityId, EntitySchema, Schema, SchemaArena};

const DRAFT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Export `schema` as a standalone JSON Schema document.
pub fn to_json_schema(schema: &CompiledSchema) -> Value {
    let arena = schema.arena();
    let root = schema.root_id();

    let mut out = Map::new();
    out.insert("$schema".into(), Value::String(DRAFT.into()));
    out.extend(entity_object(arena, root, schema.root()));

    let defs: Map<String, Value> = reachable(arena, root)
        .into_iter()
        .filter(|id| *id != root)
        .map(|id| {
            let entity = arena.entity(id);
            (entity.name.clone(), Value::Object(entity_object(arena, root, entity)))
        })
        .collect();
    if !defs.is_empty() {
        out.insert("$defs".into(), Value::Object(defs));
    }
    Value::Object(out)
}

fn entity_object(
    arena: &SchemaArena,
    root: EntityId,
    entity: &EntitySchema,
) -> Map<String, Value> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in &entity.fields {
        let mut property = field_schema(arena, root, &field.schema);
        if field.sensitive {
            if let Some(obj) = property.as_object_mut() {
                obj.insert("x-sensitive".into(), Value::Bool(true));
            }
        }
        properties.insert(field.name.clone(), property);
        if !field.schema.is_optional() {
            required.push(Value::String(field.name.clone()));
        }
    }
    let mut object = Map::new();
    object.insert("title".into(), Value::String(entity.name.clone()));
    object.insert("type".into(), Value::String("object".into()));
    object.insert("properties".into(), Value::Object(properties));
    object.insert("required".into(), Value::Array(required));
    object
}

fn field_schema(arena: &SchemaArena, root: EntityId, schema: &Schema) -> Value {
    match schema {
        Schema::Scalar(kind) => scalar_schema(*kind),
        Schema::Optional(inner) => json!({
            "anyOf": [field_schema(arena, root, inner), { "type": "null" }],
            "default": schema.default_value().unwrap_or(Value::Null),
        }),
        Schema::ListOfScalar(kind) => json!({
            "type": "array",
            "items": scalar_schema(*kind),
        }),
        Schema::ListOfEntity { id, .. } => {
            let reference = if *id == root {
                "#".to_string()
            } else {
                format!("#/$defs/{}", pointer_token(&arena.entity(*id).name))
            };
            json!({ "type": "array", "items": { "$ref": reference } })
        }
    }
}

/// Escape a `$defs` key as a JSON Pointer reference token (RFC 6901).
fn pointer_token(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

fn scalar_schema(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::String => json!({ "type": "string" }),
        ScalarKind::Date => json!({ "type": "string", "format": "date" }),
        ScalarKind::Decimal => json!({ "type": "number" }),
        ScalarKind::Integer => json!({ "type": "integer" }),
        ScalarKind::Boolean => json!({ "type": "boolean" }),
    }
}

/// Every entity reachable from `root`, including `root`.
fn reachable(arena: &SchemaArena, root: EntityId) -> BTreeSet<EntityId> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        for field in &arena.entity(id).fields {
            let mut schema = &field.schema;
            if let Schema::Optional(inner) = schema {
                schema = &**inner;
            }
            if let Schema::ListOfEntity { id: nested, .. } = schema {
                stack.push(*nested);
            }
        }
    }
    seen
}

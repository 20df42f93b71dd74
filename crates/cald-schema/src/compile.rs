//! # Schema Compilation
//!
//! Converts registry entities into explicit [`Schema`] values and memoizes
//! them in a [`SchemaCache`].
//!
//! ## Cycles
//!
//! Compiled entities live in a [`SchemaArena`] and refer to each other by
//! [`EntityId`]. Compiling an entity first reserves its slot (an empty
//! placeholder), then compiles its fields; a nested reference to an entity
//! that already has a slot resolves to that id without recursing. Every
//! entity is therefore compiled at most once per arena, and self- or
//! mutually-referential registries terminate.
//!
//! ## Publication
//!
//! The cache holds an immutable `Arc<SchemaArena>` snapshot. A miss clones
//! the snapshot, compiles into the clone under a build lock, and swaps the
//! finished arena in. Readers only ever see fully-filled entities, and a
//! failed compilation publishes nothing. Ids minted by an older snapshot
//! stay valid in every later one because arenas are append-only.

use std::collections::HashMap;
use std::sync::Arc;

use cald_core::{FieldType, ItemType, RegistrySpec, ScalarKind};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::error::SchemaError;

/// Index of a compiled entity inside a [`SchemaArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

impl EntityId {
    /// Position of the entity in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Runtime shape of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    /// A single scalar.
    Scalar(ScalarKind),
    /// The inner schema, or absent/null. Absent values take
    /// [`Schema::default_value`].
    Optional(Box<Schema>),
    /// A sequence of scalars.
    ListOfScalar(ScalarKind),
    /// A sequence of nested entity records.
    ListOfEntity {
        /// Name of the nested entity.
        name: String,
        /// Arena slot of the nested entity.
        id: EntityId,
    },
}

impl Schema {
    /// Whether absence is acceptable.
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Whether the (unwrapped) shape is a sequence.
    pub fn is_list(&self) -> bool {
        match self {
            Self::Optional(inner) => inner.is_list(),
            Self::ListOfScalar(_) | Self::ListOfEntity { .. } => true,
            Self::Scalar(_) => false,
        }
    }

    /// Value substituted for an absent optional field: `[]` for lists,
    /// `null` otherwise. `None` for required schemas.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Self::Optional(inner) if inner.is_list() => Some(Value::Array(Vec::new())),
            Self::Optional(_) => Some(Value::Null),
            _ => None,
        }
    }
}

/// A compiled field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Field name, as declared.
    pub name: String,
    /// Runtime shape, `Optional` unless the field is required.
    pub schema: Schema,
    /// Carried through from the registry.
    pub sensitive: bool,
}

/// A compiled entity: its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entity name.
    pub name: String,
    /// Compiled fields, in registry declaration order.
    pub fields: Vec<FieldSchema>,
}

impl EntitySchema {
    /// Look up a compiled field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Append-only storage for compiled entities.
#[derive(Debug, Clone, Default)]
pub struct SchemaArena {
    entities: Vec<EntitySchema>,
    index: HashMap<String, EntityId>,
}

impl SchemaArena {
    /// Slot id for an entity name, if compiled (or reserved).
    pub fn lookup(&self, name: &str) -> Option<EntityId> {
        self.index.get(name).copied()
    }

    /// The entity in slot `id`.
    ///
    /// Ids are only minted by this arena or by a snapshot it was cloned
    /// from, so the slot always exists.
    pub fn entity(&self, id: EntityId) -> &EntitySchema {
        &self.entities[id.0]
    }

    /// Number of compiled entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn reserve(&mut self, name: &str) -> EntityId {
        let id = EntityId(self.entities.len());
        self.entities.push(EntitySchema {
            name: name.to_string(),
            fields: Vec::new(),
        });
        self.index.insert(name.to_string(), id);
        id
    }

    fn fill(&mut self, id: EntityId, fields: Vec<FieldSchema>) {
        self.entities[id.0].fields = fields;
    }
}

/// A handle on one compiled entity and the arena snapshot it lives in.
///
/// Cloning is cheap; the snapshot is shared.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    arena: Arc<SchemaArena>,
    root: EntityId,
}

impl CompiledSchema {
    /// The entity this handle was compiled for.
    pub fn root(&self) -> &EntitySchema {
        self.arena.entity(self.root)
    }

    /// Arena slot of the root entity.
    pub fn root_id(&self) -> EntityId {
        self.root
    }

    /// Name of the root entity.
    pub fn name(&self) -> &str {
        &self.root().name
    }

    /// The arena snapshot, for resolving nested entity ids.
    pub fn arena(&self) -> &SchemaArena {
        &self.arena
    }
}

/// Memoized compiled schemas for one registry.
///
/// A cache must only ever be used with the registry it was first filled
/// from; entries are keyed by entity name alone.
#[derive(Debug, Default)]
pub struct SchemaCache {
    snapshot: RwLock<Arc<SchemaArena>>,
    build_lock: Mutex<()>,
}

impl SchemaCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached schema for `name`, without compiling.
    pub fn get(&self, name: &str) -> Option<CompiledSchema> {
        let arena = Arc::clone(&self.snapshot.read());
        let root = arena.lookup(name)?;
        Some(CompiledSchema { arena, root })
    }

    /// Return the cached schema for `name`, compiling (and publishing) it
    /// and everything it reaches on a miss.
    pub fn get_or_compile(
        &self,
        name: &str,
        registry: &RegistrySpec,
    ) -> Result<CompiledSchema, SchemaError> {
        if let Some(hit) = self.get(name) {
            return Ok(hit);
        }

        let _build = self.build_lock.lock();
        if let Some(hit) = self.get(name) {
            return Ok(hit);
        }

        let mut staged: SchemaArena = (**self.snapshot.read()).clone();
        let before = staged.len();
        let root = compile_into(&mut staged, registry, name)?;
        let arena = Arc::new(staged);
        *self.snapshot.write() = Arc::clone(&arena);

        tracing::debug!(
            entity = name,
            newly_compiled = arena.len() - before,
            total = arena.len(),
            "compiled entity schema"
        );
        Ok(CompiledSchema { arena, root })
    }

    /// Number of entities compiled so far.
    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    /// Whether nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compile `entity_name` from `registry`, memoized in `cache`.
///
/// Repeated calls return schemas that are structurally identical; with the
/// same cache they share one arena slot.
pub fn compile(
    entity_name: &str,
    registry: &RegistrySpec,
    cache: &SchemaCache,
) -> Result<CompiledSchema, SchemaError> {
    cache.get_or_compile(entity_name, registry)
}

fn compile_into(
    arena: &mut SchemaArena,
    registry: &RegistrySpec,
    name: &str,
) -> Result<EntityId, SchemaError> {
    if let Some(id) = arena.lookup(name) {
        return Ok(id);
    }
    let spec = registry
        .entity(name)
        .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))?;

    let id = arena.reserve(name);
    let mut fields = Vec::with_capacity(spec.fields.len());
    for field in &spec.fields {
        let shape = match &field.field_type {
            FieldType::Scalar(kind) => Schema::Scalar(*kind),
            FieldType::Array(ItemType::Scalar(kind)) => Schema::ListOfScalar(*kind),
            FieldType::Array(ItemType::Entity(nested)) => Schema::ListOfEntity {
                name: nested.clone(),
                id: compile_into(arena, registry, nested)?,
            },
        };
        let schema = if field.required {
            shape
        } else {
            Schema::Optional(Box::new(shape))
        };
        fields.push(FieldSchema {
            name: field.name.clone(),
            schema,
            sensitive: field.sensitive,
        });
    }
    arena.fill(id, fields);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cald_core::load_registry_str;

    const CYCLIC: &str = r#"
entities:
  Node:
    fields:
      label: { type: string, required: true }
      children: { type: array, items: Node }
      peers: { type: array, items: Peer }
  Peer:
    fields:
      back: { type: array, items: Node, required: true }
"#;

    fn shipped() -> RegistrySpec {
        load_registry_str(include_str!("../../../ontology/registry_v1.yaml")).unwrap()
    }

    #[test]
    fn test_compile_patient_fields_in_order() {
        let registry = shipped();
        let cache = SchemaCache::new();
        let patient = compile("Patient", &registry, &cache).unwrap();

        let names: Vec<&str> = patient.root().fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["patient_name", "patient_dob", "patient_id"]);
        assert_eq!(
            patient.root().field("patient_name").unwrap().schema,
            Schema::Scalar(ScalarKind::String)
        );
        assert_eq!(
            patient.root().field("patient_dob").unwrap().schema,
            Schema::Optional(Box::new(Schema::Scalar(ScalarKind::Date)))
        );
        assert!(patient.root().field("patient_name").unwrap().sensitive);
    }

    #[test]
    fn test_compile_required_scalar_array() {
        let registry = shipped();
        let cache = SchemaCache::new();
        let claim = compile("Claim", &registry, &cache).unwrap();
        let items = claim.root().field("line_items").unwrap();
        assert_eq!(items.schema, Schema::ListOfScalar(ScalarKind::String));
        assert!(!items.schema.is_optional());
    }

    #[test]
    fn test_compile_unknown_entity() {
        let registry = shipped();
        let cache = SchemaCache::new();
        let err = compile("Invoice", &registry, &cache).unwrap_err();
        assert_eq!(err, SchemaError::UnknownEntity("Invoice".into()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_compile_is_idempotent() {
        let registry = shipped();
        let cache = SchemaCache::new();
        let first = compile("Encounter", &registry, &cache).unwrap();
        let second = compile("Encounter", &registry, &cache).unwrap();
        assert_eq!(first.root_id(), second.root_id());
        assert_eq!(first.root(), second.root());

        let fresh = compile("Encounter", &registry, &SchemaCache::new()).unwrap();
        assert_eq!(first.root(), fresh.root());
    }

    #[test]
    fn test_compile_self_and_mutual_references_terminate() {
        let registry = load_registry_str(CYCLIC).unwrap();
        let cache = SchemaCache::new();
        let node = compile("Node", &registry, &cache).unwrap();

        assert_eq!(cache.len(), 2);
        let children = &node.root().field("children").unwrap().schema;
        let Schema::Optional(inner) = children else {
            panic!("children should be optional, got {children:?}");
        };
        assert_eq!(
            **inner,
            Schema::ListOfEntity {
                name: "Node".into(),
                id: node.root_id()
            }
        );

        let peer_id = node.arena().lookup("Peer").unwrap();
        let back = &node.arena().entity(peer_id).field("back").unwrap().schema;
        assert_eq!(
            *back,
            Schema::ListOfEntity {
                name: "Node".into(),
                id: node.root_id()
            }
        );
    }

    #[test]
    fn test_nested_entities_compiled_once() {
        let registry = load_registry_str(CYCLIC).unwrap();
        let cache = SchemaCache::new();
        compile("Peer", &registry, &cache).unwrap();
        let before = cache.len();
        compile("Node", &registry, &cache).unwrap();
        assert_eq!(cache.len(), before);
    }

    #[test]
    fn test_default_values() {
        let list = Schema::Optional(Box::new(Schema::ListOfScalar(ScalarKind::String)));
        let scalar = Schema::Optional(Box::new(Schema::Scalar(ScalarKind::Integer)));
        assert_eq!(list.default_value(), Some(Value::Array(vec![])));
        assert_eq!(scalar.default_value(), Some(Value::Null));
        assert_eq!(Schema::Scalar(ScalarKind::Boolean).default_value(), None);
    }

    #[test]
    fn test_concurrent_compiles_share_one_slot() {
        let registry = Arc::new(load_registry_str(CYCLIC).unwrap());
        let cache = Arc::new(SchemaCache::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let name = if i % 2 == 0 { "Node" } else { "Peer" };
                    let schema = cache.get_or_compile(name, &registry).unwrap();
                    // Every field of every reachable entity is filled.
                    for id in 0..schema.arena().len() {
                        assert!(!schema.arena().entity(EntityId(id)).fields.is_empty());
                    }
                    (name, schema.root_id())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(cache.len(), 2);
        for (name, id) in results {
            assert_eq!(cache.get(name).unwrap().root_id(), id);
        }
    }
}

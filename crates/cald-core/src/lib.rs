//! # cald-core: Registry Model and Loader
//!
//! The leaf crate of the ontology workspace. It owns the typed
//! representation of the entity registry and the only path that produces
//! one: [`load_registry_str`] / [`load_registry_path`].
//!
//! ## Key Design Principles
//!
//! 1. **The array/items invariant is structural.** A loaded field is either
//!    `FieldType::Scalar(kind)` or `FieldType::Array(items)`; a scalar field
//!    with `items`, or an array without, cannot be represented.
//!
//! 2. **Loading is the trust boundary.** Every consistency check (unknown
//!    types, dangling relation targets, unresolvable array items, duplicate
//!    keys) runs once, at load time, and is fatal. Nothing downstream
//!    re-checks the registry.
//!
//! 3. **Declaration order is preserved.** Entities, fields, and relations
//!    keep the order of the source document so that listings and error
//!    reports are stable.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cald-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod loader;
pub mod registry;

pub use digest::{sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::SpecError;
pub use loader::{load_registry_path, load_registry_str};
pub use registry::{
    Cardinality, EntitySpec, FieldSpec, FieldType, ItemType, RegistrySpec, RelationSpec,
    ScalarKind,
};

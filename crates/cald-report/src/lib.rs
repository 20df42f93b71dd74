//! # cald-report: Batch Reports over Document Sets
//!
//! Peripheral tools that run over the ground-truth document sets. None of
//! them feed back into the ontology core; they only read documents and
//! write report files.
//!
//! - [`docsets`]: docset configuration, document discovery, and the
//!   per-document validation summary (CSV).
//! - [`harvest`]: field catalog of every dotted path seen in the documents
//!   (CSV).
//! - [`graph`]: entity/relation graph built from projected documents,
//!   written as GEXF.

pub mod docsets;
pub mod error;
pub mod graph;
pub mod harvest;

pub use docsets::{
    validate_docsets, write_summary, Docset, DocsetConfig, DocumentReport,
    DEFAULT_SUMMARY_PATH,
};
pub use error::ReportError;
pub use graph::{build_graph, write_gexf, EntityNode, OntologyGraph, DEFAULT_GRAPH_PATH};
pub use harvest::{harvest_fields, write_catalog, FieldSample, DEFAULT_CATALOG_PATH};

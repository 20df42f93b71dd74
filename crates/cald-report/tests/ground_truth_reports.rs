//! # Ground-Truth Report Tests
//!
//! Runs the docset validation summary, field harvest and graph export over
//! the `ground_truth/` documents shipped at the repository root and checks
//! the files each report writes.

use std::path::PathBuf;
use std::sync::Arc;

use cald_audit::MemoryAuditSink;
use cald_core::load_registry_path;
use cald_report::{
    build_graph, harvest_fields, validate_docsets, write_catalog, write_gexf, write_summary,
    DocsetConfig,
};
use cald_schema::{OntologyService, ServiceConfig};

fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

fn service() -> (OntologyService, Arc<MemoryAuditSink>) {
    let registry = load_registry_path(repo_root().join("ontology/registry_v1.yaml")).unwrap();
    let sink = Arc::new(MemoryAuditSink::new());
    let svc = OntologyService::new(Arc::new(registry), sink.clone(), ServiceConfig::default());
    (svc, sink)
}

#[test]
fn test_validation_summary_over_ground_truth() {
    let (svc, sink) = service();
    let reports = validate_docsets(&svc, &repo_root(), &DocsetConfig::default()).unwrap();

    let files: Vec<&str> = reports.iter().map(|r| r.file.as_str()).collect();
    assert_eq!(
        files,
        vec![
            "ground_truth/invoices/invoice_001.json",
            "ground_truth/invoices/invoice_002.json",
            "ground_truth/intakes/intake_001.json",
            "ground_truth/consents/consent_001.json",
        ]
    );

    let failing: Vec<_> = reports.iter().filter(|r| !r.ok).collect();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].docset, "invoices");
    assert_eq!(
        failing[0].errors,
        vec!["Claim: total_amount: expected decimal, found string"]
    );

    // Batch validation is not audited.
    assert!(sink.is_empty());

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("output/reports/validation_summary.csv");
    write_summary(&reports, &path).unwrap();
    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(
        reader.headers().unwrap(),
        vec!["docset", "file", "ok", "errors"]
    );
    assert_eq!(reader.records().count(), 4);
}

#[test]
fn test_unreadable_document_is_a_failed_row() {
    let dir = tempfile::tempdir().unwrap();
    let set = dir.path().join("ground_truth/intakes");
    std::fs::create_dir_all(&set).unwrap();
    std::fs::write(set.join("broken.json"), "{\"patient_name\": ").unwrap();

    let (svc, _) = service();
    let reports = validate_docsets(&svc, dir.path(), &DocsetConfig::default()).unwrap();
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].ok);
    assert!(reports[0].errors[0].starts_with("invalid JSON"));
}

#[test]
fn test_field_catalog_over_ground_truth() {
    let rows = harvest_fields(&repo_root(), &DocsetConfig::default()).unwrap();
    assert!(rows
        .iter()
        .any(|r| r.field_path == "billing.currency" && r.source_file == "invoice_002.json"));
    assert!(rows
        .iter()
        .any(|r| r.field_path == "line_items" && r.json_type == "array"));

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("field_catalog.csv");
    write_catalog(&rows, &path).unwrap();
    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(
        reader.headers().unwrap(),
        vec!["field_path", "source_file", "json_type", "sample_value"]
    );
    assert_eq!(reader.records().count(), rows.len());
}

#[test]
fn test_graph_over_ground_truth() {
    let (svc, _) = service();
    let graph = build_graph(svc.registry(), &repo_root(), &DocsetConfig::default()).unwrap();

    // 3 patients, 3 encounters, 2 claims, 1 consent; Jane Doe's invoice
    // and consent share her Patient and Encounter nodes.
    assert_eq!(graph.node_count(), 9);
    // invoices: 2 per doc, intakes: 1, consents: 2 beyond the shared
    // has_encounter edge
    assert_eq!(graph.edge_count(), 7);

    let jane = graph
        .node_indices()
        .filter(|&i| graph[i].id == "patient:jane_doe")
        .collect::<Vec<_>>();
    assert_eq!(jane.len(), 1);
    let mut targets: Vec<&str> = graph
        .neighbors(jane[0])
        .map(|i| graph[i].id.as_str())
        .collect();
    targets.sort();
    assert_eq!(
        targets,
        vec![
            "consent:ground_truth/consents/consent_001",
            "encounter:jane_doe:2024-02-01",
        ]
    );

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("ontology_graph.gexf");
    write_gexf(&graph, &path).unwrap();
    let xml = std::fs::read_to_string(&path).unwrap();
    assert!(xml.contains(r#"id="consent:ground_truth/consents/consent_001""#));
    assert!(xml.contains(r#"id="encounter:omar_haddad:2024-03-15""#));
}

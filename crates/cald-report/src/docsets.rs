//! # Document Sets
//!
//! A docset is a named glob of JSON documents plus the entities each of
//! those documents carries. Validation projects every listed entity out of
//! each document and validates it on its own; a document passes only when
//! every entity does.
//!
//! Configuration file shape:
//!
//! ```yaml
//! docsets:
//!   - name: invoices
//!     pattern: ground_truth/invoices/*.json
//!     entities: [Patient, Encounter, Claim]
//! node_keys:
//!   Patient: [patient_name]
//!   Encounter: [patient_name, admission_date]
//! ```
//!
//! `node_keys` names, per entity, the document fields that identify one
//! real-world instance across documents. It is optional and defaults to
//! the Patient and Encounter keys above.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cald_core::RegistrySpec;
use cald_schema::{extract, OntologyService, SchemaError};

use crate::error::ReportError;

/// Default location of the validation summary.
pub const DEFAULT_SUMMARY_PATH: &str = "output/reports/validation_summary.csv";

/// One named set of documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Docset {
    /// Docset name, used in report rows.
    pub name: String,
    /// Glob, relative to the report root.
    pub pattern: String,
    /// Entities every document in the set carries.
    pub entities: Vec<String>,
}

impl Docset {
    fn new(name: &str, pattern: &str, entities: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            entities: entities.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Matching files under `root`, sorted.
    pub fn files(&self, root: &Path) -> Result<Vec<PathBuf>, ReportError> {
        let full_pattern = root.join(&self.pattern).display().to_string();
        let mut files = Vec::new();
        for entry in glob::glob(&full_pattern)? {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                ReportError::io(path, e.into())
            })?;
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// The docsets to report over, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsetConfig {
    pub docsets: Vec<Docset>,
    /// Identifying document fields per entity, used by the graph export.
    /// Entities without keys are scoped to their source document.
    #[serde(default = "default_node_keys")]
    pub node_keys: BTreeMap<String, Vec<String>>,
}

fn default_node_keys() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        ("Patient".to_string(), vec!["patient_name".to_string()]),
        (
            "Encounter".to_string(),
            vec!["patient_name".to_string(), "admission_date".to_string()],
        ),
    ])
}

impl Default for DocsetConfig {
    /// The ground-truth layout: invoices, intakes and consents.
    fn default() -> Self {
        Self {
            docsets: vec![
                Docset::new(
                    "invoices",
                    "ground_truth/invoices/*.json",
                    &["Patient", "Encounter", "Claim"],
                ),
                Docset::new(
                    "intakes",
                    "ground_truth/intakes/*.json",
                    &["Patient", "Encounter"],
                ),
                Docset::new(
                    "consents",
                    "ground_truth/consents/*.json",
                    &["Patient", "Encounter", "Consent"],
                ),
            ],
            node_keys: default_node_keys(),
        }
    }
}

impl DocsetConfig {
    /// Parse a YAML docset configuration.
    pub fn from_yaml_str(source: &str) -> Result<Self, ReportError> {
        let config: Self =
            serde_yaml::from_str(source).map_err(|e| ReportError::Config(e.to_string()))?;
        let mut seen = std::collections::HashSet::new();
        for docset in &config.docsets {
            if !seen.insert(docset.name.as_str()) {
                return Err(ReportError::Config(format!(
                    "duplicate docset name: {}",
                    docset.name
                )));
            }
        }
        Ok(config)
    }

    /// Load a YAML docset configuration from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        Self::from_yaml_str(&source)
    }

    /// Fail if any docset names an entity `registry` does not declare.
    pub fn check_against(&self, registry: &RegistrySpec) -> Result<(), ReportError> {
        for docset in &self.docsets {
            for entity in &docset.entities {
                if !registry.contains(entity) {
                    return Err(SchemaError::UnknownEntity(entity.clone()).into());
                }
            }
        }
        Ok(())
    }

    /// Identifying fields of `entity`; empty when it has none.
    pub fn keys_for(&self, entity: &str) -> &[String] {
        self.node_keys.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Read and decode one JSON document.
pub fn read_document(path: &Path) -> Result<Value, ReportError> {
    let bytes = std::fs::read(path).map_err(|e| ReportError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// `path` relative to `root` when possible, for report columns.
pub(crate) fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Validation outcome of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    /// Docset the document belongs to.
    pub docset: String,
    /// Document path, relative to the report root.
    pub file: String,
    /// Whether every entity validated.
    pub ok: bool,
    /// `"<Entity>: <path>: <detail>"` per violation.
    pub errors: Vec<String>,
}

/// Validate every document of every docset under `root`.
///
/// A document that cannot be read or decoded is reported as failed rather
/// than aborting the run.
pub fn validate_docsets(
    service: &OntologyService,
    root: &Path,
    config: &DocsetConfig,
) -> Result<Vec<DocumentReport>, ReportError> {
    config.check_against(service.registry())?;

    let mut reports = Vec::new();
    for docset in &config.docsets {
        let files = docset.files(root)?;
        tracing::debug!(docset = %docset.name, files = files.len(), "validating docset");

        for path in files {
            let mut report = DocumentReport {
                docset: docset.name.clone(),
                file: display_path(root, &path),
                ok: true,
                errors: Vec::new(),
            };

            match read_document(&path) {
                Ok(document) => {
                    for entity in &docset.entities {
                        let payload = extract(&document, entity, service.registry())?;
                        let result = service.validate_value(entity, &payload)?;
                        report
                            .errors
                            .extend(result.errors.iter().map(|e| format!("{entity}: {e}")));
                    }
                }
                Err(err) => {
                    tracing::warn!(file = %report.file, error = %err, "unreadable document");
                    report.errors.push(err.to_string());
                }
            }

            report.ok = report.errors.is_empty();
            reports.push(report);
        }
    }

    let failed = reports.iter().filter(|r| !r.ok).count();
    tracing::info!(documents = reports.len(), failed, "docset validation finished");
    Ok(reports)
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    docset: &'a str,
    file: &'a str,
    ok: bool,
    errors: String,
}

/// Write the validation summary CSV (`docset,file,ok,errors`), creating
/// parent directories.
pub fn write_summary(reports: &[DocumentReport], path: &Path) -> Result<(), ReportError> {
    create_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for report in reports {
        writer.serialize(SummaryRow {
            docset: &report.docset,
            file: &report.file,
            ok: report.ok,
            errors: report.errors.join("; "),
        })?;
    }
    writer.flush().map_err(|e| ReportError::io(path, e))?;
    Ok(())
}

pub(crate) fn create_parent(path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
        }
    }
    Ok(())
}

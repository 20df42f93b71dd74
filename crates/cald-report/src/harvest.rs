//! Field harvesting.
//!
//! Walks every document of every docset and records each dotted field path
//! once per source file, with its JSON type and a truncated sample value.
//! Nested objects are flattened; arrays are leaves.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use cald_schema::json_type_name;

use crate::docsets::{create_parent, read_document, DocsetConfig};
use crate::error::ReportError;

/// Default location of the field catalog.
pub const DEFAULT_CATALOG_PATH: &str = "ontology/field_catalog.csv";

const SAMPLE_CHARS: usize = 80;

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSample {
    pub field_path: String,
    /// File name only, without directories.
    pub source_file: String,
    pub json_type: String,
    pub sample_value: String,
}

/// Harvest field samples from every docset document under `root`.
///
/// Rows keep first-seen order. Documents that cannot be read are skipped
/// with a warning.
pub fn harvest_fields(root: &Path, config: &DocsetConfig) -> Result<Vec<FieldSample>, ReportError> {
    let mut rows = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for docset in &config.docsets {
        for path in docset.files(root)? {
            let document = match read_document(&path) {
                Ok(document) => document,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping document");
                    continue;
                }
            };
            let Some(object) = document.as_object() else {
                continue;
            };
            let source_file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let mut leaves = Vec::new();
            flatten(object, "", &mut leaves);
            for (field_path, value) in leaves {
                if seen.insert((field_path.clone(), source_file.clone())) {
                    rows.push(FieldSample {
                        field_path,
                        source_file: source_file.clone(),
                        json_type: json_type_name(value).to_string(),
                        sample_value: sample(value),
                    });
                }
            }
        }
    }

    tracing::info!(rows = rows.len(), "field harvest finished");
    Ok(rows)
}

/// Write the catalog CSV (`field_path,source_file,json_type,sample_value`).
pub fn write_catalog(rows: &[FieldSample], path: &Path) -> Result<(), ReportError> {
    create_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| ReportError::io(path, e))?;
    Ok(())
}

fn flatten<'a>(object: &'a Map<String, Value>, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
    for (key, value) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => flatten(nested, &path, out),
            _ => out.push((path, value)),
        }
    }
}

fn sample(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.chars().take(SAMPLE_CHARS).collect()
}

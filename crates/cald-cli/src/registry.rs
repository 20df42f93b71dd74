//! Registry inspection: `cald entities` and `cald check`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use cald_audit::MemoryAuditSink;
use cald_core::RegistrySpec;
use cald_schema::{OntologyService, ServiceConfig};

use crate::load_registry;

/// Print every declared entity with its field count.
pub fn run_entities(registry_path: &Path, repo_root: &Path) -> Result<u8> {
    let registry = load_registry(registry_path, repo_root)?;
    print!("{}", format_entities(&registry));
    Ok(0)
}

/// Load the registry and compile every entity schema.
///
/// Loading already enforces the structural rules; compiling additionally
/// exercises nested and recursive references.
pub fn run_check(registry_path: &Path, repo_root: &Path) -> Result<u8> {
    let registry = load_registry(registry_path, repo_root)?;
    let count = registry.len();
    let service = OntologyService::new(
        Arc::new(registry),
        Arc::new(MemoryAuditSink::new()),
        ServiceConfig::default(),
    );
    service.warm().context("schema compilation failed")?;
    println!("registry OK: {count} entities compiled");
    Ok(0)
}

fn format_entities(registry: &RegistrySpec) -> String {
    let mut out = String::new();
    for entity in registry.entities() {
        let required = entity.required_fields().count();
        out.push_str(&format!(
            "{:<16} {} fields ({} required)\n",
            entity.name,
            entity.fields.len(),
            required
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_entities_in_declaration_order() {
        let registry = cald_core::load_registry_str(
            r#"
entities:
  Zeta:
    fields:
      a: {type: string, required: true}
      b: {type: integer}
  Alpha:
    fields:
      c: {type: boolean}
"#,
        )
        .unwrap();
        let text = format_entities(&registry);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Zeta"));
        assert!(lines[0].ends_with("2 fields (1 required)"));
        assert!(lines[1].ends_with("1 fields (0 required)"));
    }

    #[test]
    fn test_check_accepts_self_referential_registry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("registry.yaml"),
            r#"
entities:
  Node:
    fields:
      label: {type: string}
      children: {type: array, items: Node}
"#,
        )
        .unwrap();
        let code = run_check(Path::new("registry.yaml"), dir.path()).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_check_rejects_unknown_items() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("registry.yaml"),
            "entities:\n  A:\n    fields:\n      xs: {type: array, items: Missing}\n",
        )
        .unwrap();
        assert!(run_check(Path::new("registry.yaml"), dir.path()).is_err());
    }
}

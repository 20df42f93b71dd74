//! # Document Validation CLI
//!
//! `cald validate <entity> <file>` reads one JSON document, validates it as
//! the named entity through the ontology service, and prints the result as
//! JSON. The attempt is appended to the JSON-lines audit log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use cald_audit::JsonlAuditSink;
use cald_schema::{OntologyService, ServiceConfig};

use crate::{load_registry, resolve_path};

/// Arguments for `cald validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Entity to validate the document as.
    pub entity: String,

    /// JSON document to validate.
    pub file: PathBuf,

    /// JSON-lines audit log to append to.
    #[arg(long, default_value = "output/logs/ontology_audit.jsonl")]
    pub audit_log: PathBuf,

    /// Actor recorded in the audit event.
    #[arg(long, default_value = "validator")]
    pub actor: String,
}

/// Execute `cald validate`. Returns 1 when the document fails validation.
pub fn run_validate(args: &ValidateArgs, registry_path: &Path, repo_root: &Path) -> Result<u8> {
    let registry = load_registry(registry_path, repo_root)?;
    let audit_log = repo_root.join(&args.audit_log);
    let service = OntologyService::new(
        Arc::new(registry),
        Arc::new(JsonlAuditSink::new(audit_log)),
        ServiceConfig::default(),
    );

    let file = resolve_path(&args.file, repo_root);
    let raw = std::fs::read(&file)
        .with_context(|| format!("failed to read document {}", file.display()))?;

    let result = service
        .validate_as(&args.actor, &args.entity, &raw)
        .with_context(|| format!("cannot validate {} as {}", file.display(), args.entity))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.ok {
        Ok(0)
    } else {
        for issue in &result.errors {
            tracing::warn!(entity = %args.entity, "{issue}");
        }
        Ok(1)
    }
}

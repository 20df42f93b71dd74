//! # JSON Schema Generation
//!
//! `cald generate` writes `<Entity>.schema.json` for every declared entity.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use cald_audit::MemoryAuditSink;
use cald_schema::{OntologyService, ServiceConfig};

use crate::load_registry;

/// Arguments for `cald generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory the schema files are written to.
    #[arg(long, default_value = "schemas")]
    pub out_dir: PathBuf,
}

/// Execute `cald generate`.
pub fn run_generate(args: &GenerateArgs, registry_path: &Path, repo_root: &Path) -> Result<u8> {
    let registry = load_registry(registry_path, repo_root)?;
    let service = OntologyService::new(
        Arc::new(registry),
        Arc::new(MemoryAuditSink::new()),
        ServiceConfig::default(),
    );

    let out_dir = repo_root.join(&args.out_dir);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    for entity in service.list_entities() {
        let schema = service.json_schema(&entity)?;
        let path = out_dir.join(format!("{entity}.schema.json"));
        let mut text = serde_json::to_string_pretty(&schema)?;
        text.push('\n');
        std::fs::write(&path, text)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("  wrote {}", path.display());
    }
    Ok(0)
}

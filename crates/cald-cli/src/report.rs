//! # Docset Reports
//!
//! `cald docsets`, `cald harvest` and `cald graph` run over the document
//! sets under the repository root. Each accepts `--docsets <yaml>` to
//! replace the built-in docset table and `--out <path>` for the report file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use cald_audit::MemoryAuditSink;
use cald_report::{
    build_graph, harvest_fields, validate_docsets, write_catalog, write_gexf, write_summary,
    DocsetConfig, DEFAULT_CATALOG_PATH, DEFAULT_GRAPH_PATH, DEFAULT_SUMMARY_PATH,
};
use cald_schema::{OntologyService, ServiceConfig};

use crate::{load_registry, resolve_path};

/// Arguments shared by the report subcommands.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// YAML docset table (defaults to the built-in invoices/intakes/consents).
    #[arg(long)]
    pub docsets: Option<PathBuf>,

    /// Report output path.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl ReportArgs {
    fn config(&self, repo_root: &Path) -> Result<DocsetConfig> {
        match &self.docsets {
            Some(path) => Ok(DocsetConfig::load(resolve_path(path, repo_root))?),
            None => Ok(DocsetConfig::default()),
        }
    }

    fn out_path(&self, repo_root: &Path, default: &str) -> PathBuf {
        repo_root.join(self.out.as_deref().unwrap_or(Path::new(default)))
    }
}

/// Execute `cald docsets`. Returns 1 when any document fails.
pub fn run_docsets(args: &ReportArgs, registry_path: &Path, repo_root: &Path) -> Result<u8> {
    let registry = load_registry(registry_path, repo_root)?;
    let config = args.config(repo_root)?;
    config.check_against(&registry)?;
    let service = OntologyService::new(
        Arc::new(registry),
        Arc::new(MemoryAuditSink::new()),
        ServiceConfig::default(),
    );

    let reports = validate_docsets(&service, repo_root, &config)?;
    let out = args.out_path(repo_root, DEFAULT_SUMMARY_PATH);
    write_summary(&reports, &out)?;

    let failed = reports.iter().filter(|r| !r.ok).count();
    for report in reports.iter().filter(|r| !r.ok) {
        for error in &report.errors {
            println!("  FAIL {}: {error}", report.file);
        }
    }
    println!(
        "{} documents, {} failed; summary written to {}",
        reports.len(),
        failed,
        out.display()
    );
    Ok(if failed == 0 { 0 } else { 1 })
}

/// Execute `cald harvest`.
pub fn run_harvest(args: &ReportArgs, repo_root: &Path) -> Result<u8> {
    let config = args.config(repo_root)?;
    let rows = harvest_fields(repo_root, &config)?;
    let out = args.out_path(repo_root, DEFAULT_CATALOG_PATH);
    write_catalog(&rows, &out)?;
    println!("{} field samples written to {}", rows.len(), out.display());
    Ok(0)
}

/// Execute `cald graph`.
pub fn run_graph(args: &ReportArgs, registry_path: &Path, repo_root: &Path) -> Result<u8> {
    let registry = load_registry(registry_path, repo_root)?;
    let config = args.config(repo_root)?;
    let graph = build_graph(&registry, repo_root, &config)?;
    let out = args.out_path(repo_root, DEFAULT_GRAPH_PATH);
    write_gexf(&graph, &out)?;
    println!(
        "graph with {} nodes and {} edges written to {}",
        graph.node_count(),
        graph.edge_count(),
        out.display()
    );
    Ok(0)
}

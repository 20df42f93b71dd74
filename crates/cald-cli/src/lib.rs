//! # cald-cli: Command Line Interface for the Ontology Registry
//!
//! ## Subcommands
//!
//! - `cald entities`: list declared entities.
//! - `cald check`: load the registry and compile every entity.
//! - `cald validate <entity> <file>`: audited validation of one document.
//! - `cald generate`: write a JSON Schema file per entity.
//! - `cald docsets` / `cald harvest` / `cald graph`: batch reports over the
//!   ground-truth document sets.
//!
//! Every handler returns the process exit code: 0 on success, 1 when a
//! document fails validation. Errors propagate as `anyhow::Error` and also
//! exit with 1.
//!
//! ```bash
//! cald check
//! cald validate Claim ground_truth/invoices/invoice_002.json
//! cald generate --out-dir schemas
//! ```

pub mod generate;
pub mod registry;
pub mod report;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use cald_core::RegistrySpec;

/// Registry loaded when `--registry` is not given.
pub const DEFAULT_REGISTRY_PATH: &str = "ontology/registry_v1.yaml";

/// Resolve a path that may be relative to the repository root.
///
/// Absolute paths are returned as-is. A relative path that exists under
/// `repo_root` resolves there; otherwise it stays relative to the current
/// directory.
pub fn resolve_path(path: &Path, repo_root: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let repo_relative = repo_root.join(path);
    if repo_relative.exists() {
        repo_relative
    } else {
        path.to_path_buf()
    }
}

/// Walk up from `start` to the first directory containing `ontology/`.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join("ontology").is_dir() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// Load and check the registry at `path` (resolved against `repo_root`).
pub fn load_registry(path: &Path, repo_root: &Path) -> Result<RegistrySpec> {
    let resolved = resolve_path(path, repo_root);
    let registry = cald_core::load_registry_path(&resolved)
        .with_context(|| format!("failed to load registry {}", resolved.display()))?;
    tracing::debug!(
        path = %resolved.display(),
        entities = registry.len(),
        "registry loaded"
    );
    Ok(registry)
}

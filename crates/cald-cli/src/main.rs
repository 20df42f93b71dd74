//! # cald CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cald_cli::generate::{run_generate, GenerateArgs};
use cald_cli::registry::{run_check, run_entities};
use cald_cli::report::{run_docsets, run_graph, run_harvest, ReportArgs};
use cald_cli::validate::{run_validate, ValidateArgs};
use cald_cli::{find_repo_root, DEFAULT_REGISTRY_PATH};

/// Ontology registry toolchain.
///
/// Checks the entity registry, validates documents against compiled entity
/// schemas, exports JSON Schema, and produces batch reports over the
/// ground-truth document sets.
#[derive(Parser, Debug)]
#[command(name = "cald", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Entity registry YAML.
    #[arg(long, global = true, default_value = DEFAULT_REGISTRY_PATH)]
    registry: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the entities the registry declares.
    Entities,

    /// Load the registry and compile every entity schema.
    Check,

    /// Validate one JSON document as an entity (audited).
    Validate(ValidateArgs),

    /// Write a JSON Schema file for every entity.
    Generate(GenerateArgs),

    /// Validate every docset document and write the CSV summary.
    Docsets(ReportArgs),

    /// Harvest dotted field paths from docset documents into a CSV catalog.
    Harvest(ReportArgs),

    /// Export the entity/relation graph of docset documents as GEXF.
    Graph(ReportArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let repo_root = find_repo_root(&cwd).unwrap_or_else(|| {
        tracing::warn!("Could not locate repository root; using current directory");
        cwd.clone()
    });
    tracing::debug!(repo_root = %repo_root.display(), "resolved repository root");

    let result = match &cli.command {
        Commands::Entities => run_entities(&cli.registry, &repo_root),
        Commands::Check => run_check(&cli.registry, &repo_root),
        Commands::Validate(args) => run_validate(args, &cli.registry, &repo_root),
        Commands::Generate(args) => run_generate(args, &cli.registry, &repo_root),
        Commands::Docsets(args) => run_docsets(args, &cli.registry, &repo_root),
        Commands::Harvest(args) => run_harvest(args, &repo_root),
        Commands::Graph(args) => run_graph(args, &cli.registry, &repo_root),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::try_parse_from(["cald", "entities"]).unwrap();
        assert!(matches!(cli.command, Commands::Entities));
        assert_eq!(cli.registry, PathBuf::from("ontology/registry_v1.yaml"));
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cald", "check", "--registry", "r.yaml", "-vv"]).unwrap();
        assert!(matches!(cli.command, Commands::Check));
        assert_eq!(cli.registry, PathBuf::from("r.yaml"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_parse_validate() {
        let cli = Cli::try_parse_from([
            "cald",
            "validate",
            "Claim",
            "ground_truth/invoices/invoice_002.json",
            "--audit-log",
            "audit.jsonl",
        ])
        .unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.entity, "Claim");
        assert_eq!(args.file, PathBuf::from("ground_truth/invoices/invoice_002.json"));
        assert_eq!(args.audit_log, PathBuf::from("audit.jsonl"));
        assert_eq!(args.actor, "validator");
    }

    #[test]
    fn test_cli_parse_validate_requires_file() {
        assert!(Cli::try_parse_from(["cald", "validate", "Claim"]).is_err());
    }

    #[test]
    fn test_cli_parse_generate_default_out_dir() {
        let cli = Cli::try_parse_from(["cald", "generate"]).unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.out_dir, PathBuf::from("schemas"));
    }

    #[test]
    fn test_cli_parse_report_options() {
        let cli =
            Cli::try_parse_from(["cald", "graph", "--docsets", "d.yaml", "--out", "g.gexf"])
                .unwrap();
        let Commands::Graph(args) = cli.command else {
            panic!("expected graph");
        };
        assert_eq!(args.docsets, Some(PathBuf::from("d.yaml")));
        assert_eq!(args.out, Some(PathBuf::from("g.gexf")));
    }

    #[test]
    fn test_cli_parse_unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["cald", "lock"]).is_err());
    }
}

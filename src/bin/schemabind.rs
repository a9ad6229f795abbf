//! Schemabind CLI
//!
//! Validate schema documents, generate modules, or inspect the dependency
//! graph.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use schemabind::{write_modules, GeneratorConfig, SchemaProject};

#[derive(Parser)]
#[command(name = "schemabind")]
#[command(about = "Cycle-aware schema-to-module code generator")]
struct Cli {
    /// Path to a config file (defaults to ./schemabind.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check documents for structural errors and resolution warnings
    Validate {
        /// Directory of schema documents
        #[arg(short, long)]
        schemas: PathBuf,
    },
    /// Generate one module per document
    Generate {
        /// Directory of schema documents
        #[arg(short, long)]
        schemas: PathBuf,

        /// Output directory (defaults to the configured output dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print dependency graph statistics, optionally exporting DOT
    Graph {
        /// Directory of schema documents
        #[arg(short, long)]
        schemas: PathBuf,

        /// Write the graph in GraphViz DOT format to this file
        #[arg(long)]
        dot: Option<PathBuf>,
    },
    /// Write a default schemabind.toml
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "schemabind.toml")]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = GeneratorConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Validate { schemas } => {
            let mut project = load_project(config, &schemas)?;
            let report = project.validate();

            for warning in &report.warnings {
                println!("warning: {}", warning);
            }
            for error in &report.errors {
                println!("error: {}", error);
            }

            if report.is_valid() {
                println!(
                    "{} documents valid ({} warnings)",
                    project.registry().len(),
                    report.warnings.len()
                );
                Ok(())
            } else {
                anyhow::bail!("{} validation error(s)", report.errors.len());
            }
        }
        Command::Generate { schemas, out } => {
            let out_dir = out.unwrap_or_else(|| config.output.dir.clone());
            let mut project = load_project(config, &schemas)?;
            let report = project.build();

            for warning in &report.warnings {
                println!("warning: {}", warning);
            }
            for error in &report.errors {
                println!("error: {}", error);
            }

            let written = write_modules(&report.modules, &out_dir)?;
            println!("wrote {} module(s) to {}", written.len(), out_dir.display());

            if report.success {
                Ok(())
            } else {
                anyhow::bail!("{} document(s) failed to generate", report.errors.len());
            }
        }
        Command::Graph { schemas, dot } => {
            let mut project = load_project(config, &schemas)?;
            project.validate();

            let graph = project.dependency_graph();
            let summary = graph.summary();
            println!(
                "{} documents, {} references, {} cycle(s)",
                summary.node_count, summary.edge_count, summary.cycle_count
            );
            for cycle in graph.cycles() {
                println!("cycle: {}", cycle.join(" -> "));
            }

            if let Some(path) = dot {
                std::fs::write(&path, graph.to_dot())?;
                println!("exported DOT to {}", path.display());
            }
            Ok(())
        }
        Command::InitConfig { path } => {
            GeneratorConfig::write_default(&path).context("writing default config")?;
            println!("wrote {}", path.display());
            Ok(())
        }
    }
}

fn load_project(config: GeneratorConfig, schemas: &PathBuf) -> anyhow::Result<SchemaProject> {
    let mut project = SchemaProject::new(config);
    let count = project
        .add_schemas_from_dir(schemas)
        .with_context(|| format!("loading schemas from {}", schemas.display()))?;
    if count == 0 {
        anyhow::bail!("no schema documents found in {}", schemas.display());
    }
    Ok(project)
}

//! Taskwire CLI - check pipeline manifests

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use walkdir::WalkDir;

use taskwire::{
    BuildOptions, FixSuggestion, Manifest, ManifestError, PipelineDefinition, ValidationMode,
};

#[derive(Parser)]
#[command(name = "taskwire")]
#[command(about = "Taskwire - validate task dependency graphs before they run")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and validate pipeline manifests
    Check {
        /// Manifest files or directories (searched for *.yaml / *.yml)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Report every invalid dependency instead of stopping at the first
        #[arg(long)]
        collect_all: bool,

        /// Print one JSON graph summary per valid manifest, one per line
        #[arg(long)]
        json: bool,
    },

    /// List the types collected from a manifest
    Types {
        /// Path to manifest file
        file: PathBuf,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            paths,
            collect_all,
            json,
        } => check(&paths, collect_all, json),
        Commands::Types { file } => list_types(&file),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = e
            .downcast_ref::<ManifestError>()
            .and_then(|err| err.fix_suggestion())
        {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn check(paths: &[PathBuf], collect_all: bool, json: bool) -> Result<()> {
    let files = manifest_files(paths);
    if files.is_empty() {
        anyhow::bail!("no manifest files found");
    }

    let mut failed = 0;
    for file in &files {
        match check_file(file, collect_all) {
            Ok(pipeline) => report_valid(file, &pipeline, json)?,
            Err(err) => {
                failed += 1;
                eprintln!("{} {}", "✗".red(), file.display());
                eprintln!("  {}", err);
                if let Some(suggestion) = err.fix_suggestion() {
                    eprintln!("  {} {}", "Fix:".yellow(), suggestion);
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} manifests invalid", failed, files.len());
    }
    Ok(())
}

fn check_file(file: &Path, collect_all: bool) -> Result<PipelineDefinition, ManifestError> {
    let manifest = Manifest::load(file)?;
    let mut options: BuildOptions = manifest.options;
    if collect_all {
        options = options.with_validation(ValidationMode::CollectAll);
    }
    manifest.build_with(&options)
}

fn report_valid(file: &Path, pipeline: &PipelineDefinition, json: bool) -> Result<()> {
    // one compact document per line, so several files stream as JSON Lines
    if json {
        let summary = serde_json::to_string(&pipeline.graph().summary())
            .context("Failed to serialize graph summary")?;
        println!("{}", summary);
        return Ok(());
    }

    println!(
        "{} Pipeline '{}' is valid ({})",
        "✓".green(),
        pipeline.name().cyan().bold(),
        file.display()
    );
    println!("  Tasks: {}", pipeline.instances().len());
    println!("  Edges: {}", pipeline.graph().edge_count());
    println!("  Types: {}", pipeline.types().len());
    for edge in pipeline.graph().edges() {
        println!("    {} {}", "→".cyan(), edge);
    }
    Ok(())
}

fn list_types(file: &Path) -> Result<()> {
    let manifest = Manifest::load(file)
        .with_context(|| format!("Failed to load manifest {:?}", file))?;
    let pipeline = manifest
        .build()
        .with_context(|| format!("Failed to build pipeline from {:?}", file))?;

    println!("{} {} types", "→".cyan(), pipeline.types().len());
    for ty in pipeline.types().iter() {
        println!("  {:<24} {}", ty.name(), ty.kind_label().dimmed());
    }
    Ok(())
}

/// Expand directories into the YAML files below them, sorted for stable output
fn manifest_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| {
                    matches!(
                        p.extension().and_then(|ext| ext.to_str()),
                        Some("yaml") | Some("yml")
                    )
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

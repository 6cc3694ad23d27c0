//! docint CLI

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use docint::table::validation::ErrorSummary;
use docint::{File, FileKind, Pipeline, PipelineSettings, get_component, list_components};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "docint")]
#[command(about = "Find and validate tables in documents through a component pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline over files or directories
    Run {
        /// Pipeline file (.yml, .yaml, .json or .toml)
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Write every processed file to the output directory as JSON
        #[arg(short, long)]
        save: bool,

        /// Override the pipeline's output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Ignore existing cache entries
        #[arg(long)]
        no_cache: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Input files; directories are searched recursively
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Check a pipeline file and every environment override without processing
    Check {
        #[arg(short, long)]
        pipeline: PathBuf,
    },

    /// List registered components
    Components,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            pipeline,
            save,
            output_dir,
            no_cache,
            format,
            inputs,
        } => {
            let mut settings = PipelineSettings::from_file(&pipeline)
                .with_context(|| format!("Failed to load pipeline {}", pipeline.display()))?;
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            if no_cache {
                settings.use_cache = false;
            }
            let save_dir = settings.output_dir.clone();

            let paths = collect_inputs(&inputs)?;
            if paths.is_empty() {
                bail!("No supported input files found");
            }

            let mut pipeline = Pipeline::from_settings(settings)?;
            let pipe_names: Vec<String> = pipeline.pipes().iter().map(|p| p.name().to_string()).collect();

            let mut processed = 0usize;
            for file in pipeline.run(&paths)? {
                let file = file?;
                if save {
                    let path = file.save_json(&save_dir)?;
                    tracing::info!(path = %path.display(), "Saved");
                }
                report(&file, &pipe_names, format)?;
                processed += 1;
            }

            if matches!(format, OutputFormat::Text) {
                println!("Processed {} of {} file(s)", processed, paths.len());
            }
            Ok(())
        }

        Commands::Check { pipeline } => {
            let settings = PipelineSettings::from_file(&pipeline)
                .with_context(|| format!("Failed to load pipeline {}", pipeline.display()))?;
            let pipeline = Pipeline::from_settings(settings)?;

            println!("Pipeline '{}' is valid", pipeline.settings().name);
            for pipe in pipeline.pipes() {
                println!("  {} ({}) -> {}", pipe.name(), pipe.component().name(), pipe.stub());
            }
            Ok(())
        }

        Commands::Components => {
            for name in list_components()? {
                let component = get_component(&name)?;
                println!("{} v{}  {}", name, component.version(), component.description());
            }
            Ok(())
        }
    }
}

fn report(file: &File, pipe_names: &[String], format: OutputFormat) -> Result<()> {
    let tables = file.as_doc().map(|d| d.tables().count()).unwrap_or(0);

    match format {
        OutputFormat::Json => {
            let errors = serde_json::to_value(&file.state().errors)?;
            let line = serde_json::json!({
                "name": file.name(),
                "path": file.path(),
                "pipes": file.state().pipe_names,
                "tables": tables,
                "edits": file.state().edits.len(),
                "errors": errors,
            });
            println!("{}", serde_json::to_string(&line)?);
        }
        OutputFormat::Text => {
            println!("{}: {} table(s), {} edit(s)", file.name(), tables, file.state().edits.len());
            for pipe in pipe_names {
                let summary = ErrorSummary::from_errors(file.errors(pipe));
                if !summary.is_empty() {
                    println!("  {}: {}", pipe, summary);
                }
            }
        }
    }
    Ok(())
}

/// Expand directories and keep files with a known extension.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk(input, &mut paths)?;
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

fn walk(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to read directory {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if FileKind::from_path(entry.path()).is_ok() {
            paths.push(entry.into_path());
        } else {
            tracing::debug!(path = %entry.path().display(), "Skipping unsupported file");
        }
    }
    Ok(())
}

//! phint CLI - type inference for PHP projects
//!
//! Collects parameter and return types from doc comments and from an Xdebug
//! function trace, decides the types every observation agrees on, and adds
//! the missing declarations to the source.

mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tempfile::TempDir;

use config::Config;
use output::{ChangeCollector, OutputFormat, Reporter};
use phint_analyze::analyzers::{DocblockAnalyzer, SourceAnalyzer, TraceAnalyzer, TraceStorageKind};
use phint_analyze::editor::CodeEditor;
use phint_analyze::index::DeclarationIndex;
use phint_analyze::logging;
use phint_analyze::project::{DecisionOptions, ProjectAnalyzer};

#[derive(Parser)]
#[command(name = "phint")]
#[command(version = "0.1.0")]
#[command(about = "Infer and add missing type declarations in PHP projects")]
#[command(author = "phint contributors")]
struct Cli {
    /// Source files or directories to analyze
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Xdebug function trace (computerized format) recorded from the test suite
    #[arg(long, short = 't', value_name = "FILE")]
    trace: Option<PathBuf>,

    /// Write the inferred declarations to the files
    #[arg(long, conflicts_with = "dry_run")]
    fix: bool,

    /// Show changes without applying them (default mode)
    #[arg(long, short = 'n')]
    dry_run: bool,

    /// Widen conflicting object types to their closest shared ancestor
    #[arg(long)]
    widen: bool,

    /// Skip doc comment analysis
    #[arg(long)]
    no_static: bool,

    /// Skip trace analysis
    #[arg(long)]
    no_dynamic: bool,

    /// Trace storage backend: memory, file
    #[arg(long, value_name = "STORAGE")]
    storage: Option<String>,

    /// Output format: text, json, diff
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(long, conflicts_with = "format")]
    json: bool,

    /// Path to config file (default: auto-detect .phint.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long)]
    no_config: bool,

    /// Write a detailed log (default: /tmp/phint-<timestamp>.log)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    log: Option<Option<PathBuf>>,

    /// Show verbose output
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = if cli.no_config {
        Config::default()
    } else if let Some(config_path) = &cli.config {
        Config::load_path(config_path)?
    } else {
        match Config::load()? {
            Some((cfg, path)) => {
                if cli.verbose {
                    eprintln!("{}: {}", "Using config".bold(), path.display());
                }
                cfg
            }
            None => Config::default(),
        }
    };

    let output_format = if cli.json {
        OutputFormat::Json
    } else {
        let name = cli
            .format
            .as_deref()
            .or(config.output.format.as_deref())
            .unwrap_or("text");
        OutputFormat::from_str(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid output format '{}'. Valid options: text, json, diff",
                name
            )
        })?
    };
    let text = output_format == OutputFormat::Text;

    if let Some(log_path) = &cli.log {
        let path = logging::init_logger(log_path.as_deref()).context("Failed to open log file")?;
        if text {
            println!("{}: {}", "Logging to".bold(), path.display());
        }
    }

    let fix_mode = cli.fix;
    let check_mode = cli.dry_run || !fix_mode;

    // Roots that exist; the rest are reported and skipped
    let mut roots = Vec::new();
    for path in &cli.paths {
        if path.exists() {
            roots.push(path.clone());
        } else if text {
            eprintln!(
                "{}: Path does not exist: {}",
                "Warning".yellow(),
                path.display()
            );
        }
    }
    if roots.is_empty() {
        anyhow::bail!("No source paths to analyze");
    }

    let filter = config.path_filter();
    let options = DecisionOptions {
        widen: cli.widen || config.analysis.widen,
    };
    let static_analysis = !cli.no_static && config.analysis.static_analysis;
    let dynamic_analysis = !cli.no_dynamic && config.analysis.dynamic;
    let trace_path = cli.trace.clone().or_else(|| config.trace.file.clone());

    // Held until the run ends; dropping it removes the spilled records
    let (storage, _storage_dir) =
        storage_kind(cli.storage.as_deref().or(config.trace.storage.as_deref()))?;

    if cli.verbose && text {
        println!("{}: {}", "Mode".bold(), if fix_mode { "fix" } else { "check" });
        println!(
            "{}: {}",
            "Sources".bold(),
            roots
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        if let Some(trace) = &trace_path {
            println!("{}: {}", "Trace".bold(), trace.display());
        }
        println!();
    }

    logging::section("DECLARATION INDEX");
    let index = Arc::new(DeclarationIndex::build(&roots, &filter));
    logging::log(&format!(
        "{} files, {} classes, {} functions",
        index.file_count(),
        index.class_count(),
        index.function_count()
    ));

    let mut project = ProjectAnalyzer::new(options);
    project.add_analyzer(Box::new(SourceAnalyzer::new(roots, filter.clone())));
    if static_analysis {
        project.add_analyzer(Box::new(DocblockAnalyzer::new(index.clone())));
    }
    match (&trace_path, dynamic_analysis) {
        (Some(trace), true) => {
            if !trace.is_file() {
                anyhow::bail!("Trace file does not exist: {}", trace.display());
            }
            project.add_analyzer(Box::new(TraceAnalyzer::new(
                trace.clone(),
                storage,
                index.clone(),
                filter,
            )));
        }
        (None, true) if cli.verbose && text => {
            eprintln!("{}: No trace file given, using static analysis only", "Note".cyan());
        }
        _ => {}
    }

    let report = project.run().context("Analysis failed")?;

    let mut reporter = Reporter::new(output_format, cli.verbose);
    reporter.record_decisions(&report.stats);
    for outcome in report.outcomes.iter().filter(|o| o.is_inconsistent()) {
        reporter.report_inconsistent(outcome);
    }

    logging::section("EDITS");
    let mut editor = CodeEditor::new(index, check_mode);
    let mut changes = ChangeCollector::new();
    for instruction in &report.instructions {
        logging::log_instruction(instruction);
        let outcome = editor
            .apply(instruction, Some(&mut changes))
            .with_context(|| format!("Failed to apply: {}", instruction))?;
        reporter.report_outcome(instruction, &outcome, fix_mode);
    }

    for (path, change) in changes.into_changes() {
        reporter.report_file(&path, &change, fix_mode);
    }

    let exit_code = if check_mode && reporter.summary().files_with_changes > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    };

    reporter.finish(check_mode)?;

    Ok(exit_code)
}

/// Resolve the storage backend; the file backend gets a fresh temporary directory
fn storage_kind(name: Option<&str>) -> Result<(TraceStorageKind, Option<TempDir>)> {
    match name {
        None | Some("memory") => Ok((TraceStorageKind::Memory, None)),
        Some("file") => {
            let dir = tempfile::Builder::new()
                .prefix("phint-storage-")
                .tempdir()
                .context("Failed to create trace storage directory")?;
            Ok((TraceStorageKind::File(dir.path().join("trace-store")), Some(dir)))
        }
        Some(other) => anyhow::bail!(
            "Invalid storage '{}'. Valid options: memory, file",
            other
        ),
    }
}

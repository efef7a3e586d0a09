//! Directory scan: load files, run the pipeline, write the report.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use seiri_scanners::{FileRecord, Pipeline, RawFinding, TriageEngine, TriagePath};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules", "__pycache__", ".venv"];

const MAX_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Repository name shown in the report header (defaults to the
    /// directory name)
    #[arg(long)]
    pub repo: Option<String>,

    /// Where to write the markdown report
    #[arg(short, long, default_value = "SECURITY_REPORT.md")]
    pub output: PathBuf,

    /// Also save the raw triage result as JSON
    #[arg(long)]
    pub save_result: Option<PathBuf>,

    /// Skip the LLM triage and use the deterministic ranking
    #[arg(long)]
    pub no_llm: bool,
}

pub async fn execute(args: ScanArgs) -> Result<()> {
    let repo = args.repo.clone().unwrap_or_else(|| repo_name(&args.path));
    let files = load_files(&args.path)?;

    println!(
        "{}",
        format!("Scanning {} ({} files)", repo, files.len())
            .bright_blue()
            .bold()
    );

    let engine = if args.no_llm {
        TriageEngine::new(vec![])
    } else {
        TriageEngine::from_env()
    };

    let pipeline = Pipeline::new(engine);
    let outcome = pipeline.run(&files, &repo).await;

    std::fs::write(&args.output, &outcome.report)
        .with_context(|| format!("failed to write report to {}", args.output.display()))?;

    if let Some(result_path) = &args.save_result {
        let json = serde_json::to_string_pretty(&outcome.result)?;
        std::fs::write(result_path, json)
            .with_context(|| format!("failed to write result to {}", result_path.display()))?;
    }

    print_summary(&outcome.raw_findings, &outcome.result);
    println!("Report written to {}", args.output.display().to_string().bright_green());

    Ok(())
}

fn print_summary(raw_findings: &[RawFinding], result: &seiri_scanners::PrioritizedResult) {
    if raw_findings.is_empty() {
        println!("{}", "Scan passed; no issues found.".bright_green().bold());
        return;
    }

    println!(
        "{}",
        format!(
            "{} raw findings, {} prioritized",
            raw_findings.len(),
            result.findings.len()
        )
        .bright_yellow()
        .bold()
    );

    if let Some(meta) = &result.analysis_meta {
        let path = meta.path.as_str();
        match meta.path {
            TriagePath::Ok => println!("Triage: {}", path.bright_green()),
            _ => println!("Triage: {}", path.bright_yellow()),
        }
        if let Some(model) = &meta.model {
            println!("Model: {model}");
        }
    }

    for finding in &result.findings {
        let kind = finding.finding.kind().as_str();
        let location = finding.finding.path().unwrap_or("-");
        println!(
            "  {} {} {}",
            format!("[{}]", kind).bright_red(),
            location,
            finding.risk_explanation.dimmed()
        );
    }
}

fn repo_name(path: &Path) -> String {
    path.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "repository".to_string())
}

fn skipped(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIPPED_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Builds `FileRecord`s with forward-slash paths relative to the scan
/// root. Binary and oversized files are skipped.
pub fn load_files(root: &Path) -> Result<Vec<FileRecord>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !skipped(e))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = entry.metadata()?;
        if metadata.len() > MAX_FILE_SIZE {
            debug!("skipping oversized file {}", entry.path().display());
            continue;
        }

        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            debug!("skipping non-utf8 file {}", entry.path().display());
            continue;
        };

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push(FileRecord::new(relative, content));
    }

    Ok(files)
}

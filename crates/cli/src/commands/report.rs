//! Re-render a markdown report from a saved triage result.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use seiri_scanners::{PrioritizedResult, ReportRenderer};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Triage result JSON produced by `scan --save-result`
    #[arg(value_name = "RESULT")]
    pub input: PathBuf,

    /// Repository name shown in the report header
    #[arg(long)]
    pub repo: String,

    /// Where to write the markdown report; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: ReportArgs) -> Result<()> {
    let json = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let result: PrioritizedResult = serde_json::from_str(&json)
        .with_context(|| format!("{} is not a valid triage result", args.input.display()))?;

    let report = ReportRenderer::generate(&result, &args.repo);

    match &args.output {
        Some(path) => {
            std::fs::write(path, &report)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!(
                "Report written to {}",
                path.display().to_string().bright_green()
            );
        }
        None => print!("{report}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_round_trips_saved_result() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("result.json");
        let output = temp.path().join("report.md");

        let result = PrioritizedResult {
            findings: vec![],
            developer_summary: None,
            analysis_meta: None,
        };
        fs::write(&input, serde_json::to_string(&result).unwrap()).unwrap();

        execute(ReportArgs {
            input,
            repo: "acme/app".to_string(),
            output: Some(output.clone()),
        })
        .unwrap();

        let report = fs::read_to_string(output).unwrap();
        assert!(report.contains("# Seiri Security Report"));
        assert!(report.contains("Scan passed; no issues found."));
    }

    #[test]
    fn test_rejects_malformed_input() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("bad.json");
        fs::write(&input, "{not json").unwrap();

        let err = execute(ReportArgs {
            input,
            repo: "acme/app".to_string(),
            output: None,
        });
        assert!(err.is_err());
    }
}

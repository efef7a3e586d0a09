//! Pipeline orchestration.
//!
//! Runs the scanner set over one file snapshot, hands the concatenated
//! findings to the triage engine, and renders the markdown report.
//! Scanner errors are fail-open: a broken scanner loses its own
//! findings, never the run.

use crate::core::{FileRecord, PrioritizedResult, RawFinding};
use crate::report::ReportRenderer;
use crate::scanners::{default_scanners, Scanner};
use crate::triage::TriageEngine;
use tracing::{debug, warn};

pub struct ScanOutcome {
    pub raw_findings: Vec<RawFinding>,
    pub result: PrioritizedResult,
    pub report: String,
}

pub struct Pipeline {
    scanners: Vec<Box<dyn Scanner>>,
    engine: TriageEngine,
}

impl Pipeline {
    pub fn new(engine: TriageEngine) -> Self {
        Self {
            scanners: default_scanners(),
            engine,
        }
    }

    pub fn with_scanners(mut self, scanners: Vec<Box<dyn Scanner>>) -> Self {
        self.scanners = scanners;
        self
    }

    /// Scanner order is fixed; fallback tie-breaking depends on the
    /// concatenation order of their findings.
    pub async fn collect_findings(&self, files: &[FileRecord]) -> Vec<RawFinding> {
        let mut raw_findings = Vec::new();
        for scanner in &self.scanners {
            match scanner.scan(files).await {
                Ok(findings) => {
                    debug!("scanner {} produced {} findings", scanner.id(), findings.len());
                    raw_findings.extend(findings);
                }
                Err(e) => {
                    warn!("scanner {} failed: {e}", scanner.id());
                }
            }
        }
        raw_findings
    }

    pub async fn run(&self, files: &[FileRecord], repo: &str) -> ScanOutcome {
        let raw_findings = self.collect_findings(files).await;
        debug!(
            "collected {} raw findings from {} files",
            raw_findings.len(),
            files.len()
        );

        let result = self.engine.prioritize(&raw_findings).await;
        let report = ReportRenderer::generate(&result, repo);

        ScanOutcome {
            raw_findings,
            result,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use crate::core::ScannerKind;

    struct BrokenScanner;

    #[async_trait]
    impl Scanner for BrokenScanner {
        fn id(&self) -> &'static str {
            "broken"
        }

        fn kind(&self) -> ScannerKind {
            ScannerKind::Other
        }

        async fn scan(&self, _files: &[FileRecord]) -> Result<Vec<RawFinding>> {
            anyhow::bail!("scanner blew up")
        }
    }

    struct OneFinding;

    #[async_trait]
    impl Scanner for OneFinding {
        fn id(&self) -> &'static str {
            "one"
        }

        fn kind(&self) -> ScannerKind {
            ScannerKind::Env
        }

        async fn scan(&self, _files: &[FileRecord]) -> Result<Vec<RawFinding>> {
            Ok(vec![RawFinding::Env {
                path: ".env".to_string(),
                issue: "dotenv_not_gitignored".to_string(),
                detail: String::new(),
            }])
        }
    }

    #[tokio::test]
    async fn test_broken_scanner_is_fail_open() {
        let pipeline = Pipeline::new(TriageEngine::new(vec![]))
            .with_scanners(vec![Box::new(BrokenScanner), Box::new(OneFinding)]);

        let outcome = pipeline.run(&[], "acme/app").await;
        assert_eq!(outcome.raw_findings.len(), 1);
        assert_eq!(outcome.result.findings.len(), 1);
        assert!(outcome.report.contains("[SEV-001]"));
    }

    #[tokio::test]
    async fn test_clean_run_reports_pass() {
        let pipeline =
            Pipeline::new(TriageEngine::new(vec![])).with_scanners(vec![Box::new(BrokenScanner)]);

        let outcome = pipeline.run(&[], "acme/app").await;
        assert!(outcome.raw_findings.is_empty());
        assert!(outcome.report.contains("Scan passed; no issues found."));
    }
}

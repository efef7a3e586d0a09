//! Markdown report synthesis.
//!
//! The report is written for an automated fixer first and a human
//! second: a fixed imperative preamble, then one section per
//! prioritized finding in input order. Rendering never reorders input
//! and omits absent fields instead of erroring.

use crate::core::{PrioritizedFinding, PrioritizedResult, RawFinding};
use chrono::{DateTime, Utc};

const PREAMBLE: &[&str] = &[
    "You are an AI coding agent. Fix each issue below in order.",
    "Do not skip any issues. Do not ask clarifying questions.",
    "Use the fix instructions exactly as written.",
    "After fixing all issues run the verification step for each.",
];

pub struct ReportRenderer;

impl ReportRenderer {
    pub fn generate(result: &PrioritizedResult, repo: &str) -> String {
        Self::generate_at(result, repo, Utc::now())
    }

    /// Timestamp-injected variant so tests can pin the header.
    pub fn generate_at(result: &PrioritizedResult, repo: &str, scanned_at: DateTime<Utc>) -> String {
        let mut report = String::new();

        report.push_str("# Seiri Security Report\n");
        report.push_str(&format!("Repo: {repo}\n"));
        report.push_str(&format!(
            "Scanned: {}\n",
            scanned_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        report.push_str(&format!("Issues Found: {}\n\n", result.findings.len()));

        for line in PREAMBLE {
            report.push_str(line);
            report.push('\n');
        }
        report.push('\n');

        if let Some(meta) = &result.analysis_meta {
            report.push_str("## Triage Engine\n\n");
            report.push_str(&format!("- **Path**: {}\n", meta.path.as_str()));
            if let Some(model) = &meta.model {
                report.push_str(&format!("- **Model**: {model}\n"));
            }
            report.push_str(&format!("- **Raw Findings**: {}\n", meta.raw_findings));
            if let Some(items) = meta.raw_plan_items {
                report.push_str(&format!("- **Plan Items**: {items}\n"));
            }
            report.push_str(&format!("- **Mapped Findings**: {}\n", meta.mapped_findings));
            if let Some(detail) = &meta.reason_detail {
                report.push_str(&format!("- **Reason**: {detail}\n"));
            }
            report.push('\n');
        }

        if let Some(summary) = &result.developer_summary {
            let summary = summary.trim();
            if !summary.is_empty() {
                report.push_str("## Developer Summary\n\n");
                report.push_str(summary);
                report.push_str("\n\n");
            }
        }

        if result.findings.is_empty() {
            report.push_str("Scan passed; no issues found.\n");
            return report;
        }

        for (i, finding) in result.findings.iter().enumerate() {
            Self::append_finding(&mut report, finding, i + 1);
        }

        report
    }

    fn append_finding(report: &mut String, finding: &PrioritizedFinding, index: usize) {
        let severity = Self::severity_label(&finding.finding);
        let title = Self::title(&finding.finding);
        report.push_str(&format!("## [SEV-{index:03}] {severity} -- {title}\n\n"));

        if let Some(path) = finding.finding.path() {
            match Self::file_type_label(path) {
                Some(label) => report.push_str(&format!("**File:** {path} ({label})\n")),
                None => report.push_str(&format!("**File:** {path}\n")),
            }
        }

        match &finding.finding {
            RawFinding::Secrets {
                line_no, evidence, ..
            } => {
                report.push_str(&format!("**Line:** {line_no}\n"));
                if !evidence.is_empty() {
                    report.push_str(&format!("**Evidence:** `{evidence}`\n"));
                }
            }
            RawFinding::Env { detail, .. } => {
                if !detail.is_empty() {
                    report.push_str(&format!("**Detail:** {detail}\n"));
                }
            }
            RawFinding::Dependencies {
                package,
                version,
                cve_id,
                summary,
                ..
            } => {
                report.push_str(&format!("**Package:** {package} {version}\n"));
                report.push_str(&format!("**CVE:** {cve_id}\n"));
                if !summary.is_empty() {
                    report.push_str(&format!("**Detail:** {summary}\n"));
                }
            }
            RawFinding::Other { detail, .. } => {
                if let Some(detail) = detail {
                    if !detail.is_empty() {
                        report.push_str(&format!("**Detail:** {detail}\n"));
                    }
                }
            }
        }

        report.push_str(&format!("**Risk:** {}\n", finding.risk_explanation));

        let mapping = &finding.mapping;
        if !mapping.owasp_category.is_empty()
            || !mapping.owasp_refs.is_empty()
            || !mapping.standard_fix_requirements.is_empty()
        {
            report.push('\n');
            if !mapping.owasp_category.is_empty() {
                report.push_str(&format!("**OWASP Category:** {}\n", mapping.owasp_category));
            }
            if !mapping.owasp_refs.is_empty() {
                report.push_str(&format!(
                    "**OWASP References:** {}\n",
                    mapping.owasp_refs.join(", ")
                ));
            }
            if !mapping.standard_fix_requirements.is_empty() {
                report.push_str("**Standard Fix Requirements:**\n");
                for requirement in &mapping.standard_fix_requirements {
                    report.push_str(&format!("- {requirement}\n"));
                }
            }
        }

        report.push('\n');
        report.push_str("**Fix Steps:**\n");
        for (j, step) in finding.fix_steps.iter().enumerate() {
            report.push_str(&format!("{}. {step}\n", j + 1));
        }
        report.push_str(&format!("**Verify:** {}\n\n", finding.verify));
    }

    fn title(finding: &RawFinding) -> String {
        match finding {
            RawFinding::Secrets { pattern_name, .. } => pattern_name.clone(),
            RawFinding::Env { issue, .. } => format!(".env: {issue}"),
            RawFinding::Dependencies {
                package,
                version,
                cve_id,
                ..
            } => format!("{package} {version} — {cve_id}"),
            RawFinding::Other { .. } => "Security finding".to_string(),
        }
    }

    fn severity_label(finding: &RawFinding) -> &str {
        match finding {
            RawFinding::Secrets { .. } | RawFinding::Env { .. } => "CRITICAL",
            RawFinding::Dependencies { severity, .. } => severity.label(),
            RawFinding::Other { .. } => "HIGH",
        }
    }

    /// Short language label derived from the file name, appended after
    /// the path so the fixer does not have to guess the file type.
    fn file_type_label(path: &str) -> Option<&'static str> {
        let name = path.rsplit('/').next().unwrap_or(path);
        if name == ".env" || name.starts_with(".env.") {
            return Some("Dotenv");
        }
        let extension = name.rsplit('.').next()?;
        match extension {
            "py" => Some("Python"),
            "js" => Some("JavaScript"),
            "jsx" => Some("JavaScript"),
            "ts" => Some("TypeScript"),
            "tsx" => Some("TypeScript"),
            "rs" => Some("Rust"),
            "go" => Some("Go"),
            "rb" => Some("Ruby"),
            "java" => Some("Java"),
            "php" => Some("PHP"),
            "json" => Some("JSON"),
            "toml" => Some("TOML"),
            "yml" | "yaml" => Some("YAML"),
            "txt" => Some("Text"),
            "sh" => Some("Shell"),
            _ => None,
        }
    }
}

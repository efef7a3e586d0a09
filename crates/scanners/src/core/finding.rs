//! Finding data model shared by every pipeline stage.
//!
//! Scanners emit [`RawFinding`]s, the triage engine enriches a capped
//! subset into [`PrioritizedFinding`]s, and the renderer consumes the
//! resulting [`PrioritizedResult`]. Everything here is created and
//! consumed within a single pipeline invocation.

use crate::core::Severity;
use crate::mapping::ResolvedMapping;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One decoded repository file handed to the scanners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    Secrets,
    Env,
    Dependencies,
    Other,
}

impl ScannerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secrets => "secrets",
            Self::Env => "env",
            Self::Dependencies => "dependencies",
            Self::Other => "other",
        }
    }

    /// Tie-break rank for the deterministic fallback ordering.
    pub fn fallback_rank(&self) -> u32 {
        match self {
            Self::Secrets => 0,
            Self::Env => 1,
            Self::Dependencies => 2,
            Self::Other => 99,
        }
    }
}

impl fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unprocessed detection. Each variant carries exactly the
/// fields its scanner produces, so shape errors surface at construction
/// rather than at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scanner", rename_all = "lowercase")]
pub enum RawFinding {
    Secrets {
        path: String,
        line_no: u32,
        line_content: String,
        pattern_name: String,
        evidence: String,
    },
    Env {
        path: String,
        issue: String,
        detail: String,
    },
    Dependencies {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        path: Option<String>,
        package: String,
        version: String,
        cve_id: String,
        severity: Severity,
        summary: String,
    },
    Other {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        detail: Option<String>,
    },
}

impl RawFinding {
    pub fn kind(&self) -> ScannerKind {
        match self {
            Self::Secrets { .. } => ScannerKind::Secrets,
            Self::Env { .. } => ScannerKind::Env,
            Self::Dependencies { .. } => ScannerKind::Dependencies,
            Self::Other { .. } => ScannerKind::Other,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Secrets { path, .. } | Self::Env { path, .. } => Some(path),
            Self::Dependencies { path, .. } | Self::Other { path, .. } => path.as_deref(),
        }
    }

    /// Issue label used by the mapping resolver's `by_issue` level.
    pub fn issue(&self) -> Option<&str> {
        match self {
            Self::Env { issue, .. } => Some(issue),
            _ => None,
        }
    }

    /// Pattern name used by the mapping resolver's `by_pattern_name` level.
    pub fn pattern_name(&self) -> Option<&str> {
        match self {
            Self::Secrets { pattern_name, .. } => Some(pattern_name),
            _ => None,
        }
    }
}

/// A raw finding enriched with rank, remediation narrative, and the
/// resolved standard-mapping fields. `order` is zero-based and defines
/// render order; values are unique within one result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritizedFinding {
    #[serde(flatten)]
    pub finding: RawFinding,
    pub order: usize,
    pub risk_explanation: String,
    pub fix_steps: Vec<String>,
    pub verify: String,
    #[serde(flatten)]
    pub mapping: ResolvedMapping,
}

/// Which engine branch produced the result. Purely diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriagePath {
    NoFindings,
    MissingApiKey,
    ProviderRequestFailed,
    ParseFailedOrMissingRemediationPlan,
    EmptyRemediationPlan,
    NoValidFindingIdsFromPlan,
    Ok,
}

impl TriagePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoFindings => "no_findings",
            Self::MissingApiKey => "missing_api_key",
            Self::ProviderRequestFailed => "provider_request_failed",
            Self::ParseFailedOrMissingRemediationPlan => {
                "parse_failed_or_missing_remediation_plan"
            }
            Self::EmptyRemediationPlan => "empty_remediation_plan",
            Self::NoValidFindingIdsFromPlan => "no_valid_finding_ids_from_plan",
            Self::Ok => "ok",
        }
    }

    /// True for every branch that ran the deterministic fallback.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::NoFindings | Self::Ok)
    }
}

impl fmt::Display for TriagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMeta {
    pub path: TriagePath,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason_detail: Option<String>,

    pub raw_findings: usize,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_plan_items: Option<usize>,

    pub mapped_findings: usize,
}

/// Output of the prioritization engine, consumed by the report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritizedResult {
    pub findings: Vec<PrioritizedFinding>,
    pub developer_summary: Option<String>,
    pub analysis_meta: Option<AnalysisMeta>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_finding_tagged_serialization() {
        let finding = RawFinding::Secrets {
            path: "src/app.py".to_string(),
            line_no: 3,
            line_content: "api_key = \"sk-abc\"".to_string(),
            pattern_name: "OpenAI API Key".to_string(),
            evidence: "sk-abc".to_string(),
        };

        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["scanner"], "secrets");
        assert_eq!(json["pattern_name"], "OpenAI API Key");

        let back: RawFinding = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), ScannerKind::Secrets);
    }

    #[test]
    fn test_dependency_severity_wire_format() {
        let finding = RawFinding::Dependencies {
            path: Some("requirements.txt".to_string()),
            package: "flask".to_string(),
            version: "0.1".to_string(),
            cve_id: "CVE-2020-0001".to_string(),
            severity: Severity::High,
            summary: "old".to_string(),
        };

        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["severity"], "HIGH");
    }

    #[test]
    fn test_fallback_ranks() {
        assert_eq!(ScannerKind::Secrets.fallback_rank(), 0);
        assert_eq!(ScannerKind::Env.fallback_rank(), 1);
        assert_eq!(ScannerKind::Dependencies.fallback_rank(), 2);
        assert_eq!(ScannerKind::Other.fallback_rank(), 99);
    }

    #[test]
    fn test_triage_path_labels() {
        assert_eq!(TriagePath::NoFindings.as_str(), "no_findings");
        assert_eq!(TriagePath::Ok.as_str(), "ok");
        assert!(TriagePath::MissingApiKey.is_fallback());
        assert!(!TriagePath::Ok.is_fallback());
    }
}

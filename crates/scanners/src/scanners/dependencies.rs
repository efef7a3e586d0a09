//! Known-vulnerable dependency detection backed by the OSV database.
//!
//! Parses `requirements.txt` and `package.json`, queries OSV per
//! package, and keeps only CRITICAL/HIGH advisories that carry a CVE id.
//! Every network or parse error is swallowed per package: a flaky
//! advisory feed degrades coverage, never the pipeline.

use crate::core::{FileRecord, RawFinding, ScannerKind, Severity};
use crate::scanners::Scanner;
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const OSV_URL: &str = "https://api.osv.dev/v1/query";
const QUERY_TIMEOUT: Duration = Duration::from_secs(15);
const SUMMARY_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct OsvVuln {
    pub id: String,
    pub severity: Severity,
    pub summary: String,
}

pub struct DependencyScanner {
    client: reqwest::Client,
    query_url: String,
    pinned: Option<Regex>,
    bare: Option<Regex>,
}

impl Default for DependencyScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyScanner {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            query_url: OSV_URL.to_string(),
            pinned: Regex::new(r"^([a-zA-Z0-9_-]+)\s*==\s*(\S+)").ok(),
            bare: Regex::new(r"^([a-zA-Z0-9_-]+)\s*(\S*)").ok(),
        }
    }

    /// Points the scanner at a different OSV-compatible endpoint.
    pub fn with_query_url(mut self, url: impl Into<String>) -> Self {
        self.query_url = url.into();
        self
    }

    pub fn parse_requirements(&self, content: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for raw_line in content.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if let Some(caps) = self.pinned.as_ref().and_then(|re| re.captures(line)) {
                out.push((caps[1].to_string(), caps[2].to_string()));
                continue;
            }
            if line.starts_with('-') {
                continue;
            }
            if let Some(caps) = self.bare.as_ref().and_then(|re| re.captures(line)) {
                let version = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                let version = if version.is_empty() { "0.0.0" } else { version };
                out.push((caps[1].to_string(), version.to_string()));
            }
        }
        out
    }

    pub fn parse_package_json(content: &str) -> Vec<(String, String)> {
        let Ok(data) = serde_json::from_str::<Value>(content) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for key in ["dependencies", "devDependencies"] {
            let Some(deps) = data.get(key).and_then(Value::as_object) else {
                continue;
            };
            for (name, version) in deps {
                let version = match version.as_str() {
                    Some(v) => v.trim().trim_start_matches(['^', '~']).to_string(),
                    None => version.to_string(),
                };
                let version = if version.is_empty() {
                    "0.0.0".to_string()
                } else {
                    version
                };
                out.push((name.clone(), version));
            }
        }
        out
    }

    /// Filters an OSV query response down to CRITICAL/HIGH advisories
    /// carrying a CVE id.
    pub fn filter_response(data: &Value) -> Vec<OsvVuln> {
        let Some(vulns) = data.get("vulns").and_then(Value::as_array) else {
            return Vec::new();
        };
        vulns
            .iter()
            .filter_map(|vuln| {
                let severity_label = vuln
                    .get("database_specific")
                    .and_then(|d| d.get("severity"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_ascii_uppercase();
                if severity_label != "CRITICAL" && severity_label != "HIGH" {
                    return None;
                }
                let id = vuln.get("id").and_then(Value::as_str).unwrap_or("");
                if !id.contains("CVE-") {
                    return None;
                }
                let summary = vuln
                    .get("summary")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .or_else(|| vuln.get("details").and_then(Value::as_str))
                    .unwrap_or("");
                Some(OsvVuln {
                    id: id.to_string(),
                    severity: Severity::from_label(&severity_label),
                    summary: summary.chars().take(SUMMARY_LIMIT).collect(),
                })
            })
            .collect()
    }

    async fn query_osv(&self, package: &str, version: &str, ecosystem: &str) -> Vec<OsvVuln> {
        let body = json!({
            "package": { "name": package, "ecosystem": ecosystem },
            "version": version,
        });

        let response = self
            .client
            .post(&self.query_url)
            .timeout(QUERY_TIMEOUT)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let data = match response {
            Ok(response) => match response.json::<Value>().await {
                Ok(data) => data,
                Err(e) => {
                    debug!("OSV response for {package} {version} was not JSON: {e}");
                    return Vec::new();
                }
            },
            Err(e) => {
                warn!("OSV query failed for {package} {version}: {e}");
                return Vec::new();
            }
        };

        Self::filter_response(&data)
    }

    async fn scan_manifest(
        &self,
        manifest_path: &str,
        packages: Vec<(String, String)>,
        ecosystem: &str,
        findings: &mut Vec<RawFinding>,
    ) {
        for (package, version) in packages {
            for vuln in self.query_osv(&package, &version, ecosystem).await {
                findings.push(RawFinding::Dependencies {
                    path: Some(manifest_path.to_string()),
                    package: package.clone(),
                    version: version.clone(),
                    cve_id: vuln.id,
                    severity: vuln.severity,
                    summary: vuln.summary,
                });
            }
        }
    }
}

#[async_trait]
impl Scanner for DependencyScanner {
    fn id(&self) -> &'static str {
        "dependencies"
    }

    fn kind(&self) -> ScannerKind {
        ScannerKind::Dependencies
    }

    async fn scan(&self, files: &[FileRecord]) -> Result<Vec<RawFinding>> {
        let mut findings = Vec::new();

        if let Some(file) = files.iter().find(|f| f.path.ends_with("requirements.txt")) {
            let packages = self.parse_requirements(&file.content);
            self.scan_manifest(&file.path, packages, "PyPI", &mut findings)
                .await;
        }

        if let Some(file) = files.iter().find(|f| f.path.ends_with("package.json")) {
            let packages = Self::parse_package_json(&file.content);
            self.scan_manifest(&file.path, packages, "npm", &mut findings)
                .await;
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requirements() {
        let scanner = DependencyScanner::new();
        let parsed = scanner.parse_requirements(
            "flask==0.12.2\nrequests==2.6.0  # pinned\n\n# comment\nclick\n-r other.txt\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("flask".to_string(), "0.12.2".to_string()),
                ("requests".to_string(), "2.6.0".to_string()),
                ("click".to_string(), "0.0.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_package_json() {
        let parsed = DependencyScanner::parse_package_json(
            r#"{
                "name": "demo",
                "dependencies": { "lodash": "^4.17.4" },
                "devDependencies": { "mocha": "~3.0.0" }
            }"#,
        );
        assert!(parsed.contains(&("lodash".to_string(), "4.17.4".to_string())));
        assert!(parsed.contains(&("mocha".to_string(), "3.0.0".to_string())));
    }

    #[test]
    fn test_parse_package_json_malformed_is_empty() {
        assert!(DependencyScanner::parse_package_json("{not json").is_empty());
    }

    #[test]
    fn test_filter_response_severity_and_cve_gate() {
        let data = serde_json::json!({
            "vulns": [
                {
                    "id": "CVE-2020-0001",
                    "database_specific": { "severity": "HIGH" },
                    "summary": "remote code execution"
                },
                {
                    "id": "CVE-2020-0002",
                    "database_specific": { "severity": "LOW" },
                    "summary": "minor issue"
                },
                {
                    "id": "GHSA-xxxx-yyyy",
                    "database_specific": { "severity": "CRITICAL" },
                    "summary": "no cve id"
                },
                {
                    "id": "PYSEC-2021-1 CVE-2021-9999",
                    "database_specific": { "severity": "CRITICAL" },
                    "details": "fallback to details"
                }
            ]
        });

        let vulns = DependencyScanner::filter_response(&data);
        assert_eq!(vulns.len(), 2);
        assert_eq!(vulns[0].id, "CVE-2020-0001");
        assert_eq!(vulns[0].severity, Severity::High);
        assert_eq!(vulns[1].severity, Severity::Critical);
        assert_eq!(vulns[1].summary, "fallback to details");
    }

    #[test]
    fn test_filter_response_truncates_summary() {
        let long = "x".repeat(500);
        let data = serde_json::json!({
            "vulns": [{
                "id": "CVE-2024-1111",
                "database_specific": { "severity": "HIGH" },
                "summary": long
            }]
        });

        let vulns = DependencyScanner::filter_response(&data);
        assert_eq!(vulns[0].summary.len(), 200);
    }

    #[test]
    fn test_filter_response_no_vulns_key() {
        assert!(DependencyScanner::filter_response(&serde_json::json!({})).is_empty());
    }
}

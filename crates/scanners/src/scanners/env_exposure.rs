//! Committed-dotenv exposure checks.

use crate::core::{FileRecord, RawFinding, ScannerKind};
use crate::scanners::Scanner;
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

const PLACEHOLDER_VALUES: &[&str] = &[
    "your_key_here",
    "xxx",
    "changeme",
    "example",
    "placeholder",
    "secret",
    "password",
    "replace_me",
    "your_value",
    "env_value",
];

const MAX_PLACEHOLDER_LEN: usize = 20;

pub struct EnvExposureScanner {
    assignment: Option<Regex>,
}

impl Default for EnvExposureScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvExposureScanner {
    pub fn new() -> Self {
        Self {
            assignment: Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.*)").ok(),
        }
    }

    fn env_ignored(gitignore: &str) -> bool {
        gitignore
            .lines()
            .filter_map(|line| line.split('#').next())
            .map(str::trim)
            .any(|line| line == ".env" || line.starts_with(".env"))
    }

    fn parse_values(&self, content: &str) -> Vec<(String, String)> {
        let Some(assignment) = &self.assignment else {
            return Vec::new();
        };
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let caps = assignment.captures(line)?;
                let key = caps.get(1)?.as_str().to_string();
                let value = caps
                    .get(2)?
                    .as_str()
                    .trim()
                    .trim_matches(|c| c == '\'' || c == '"')
                    .trim()
                    .to_string();
                Some((key, value))
            })
            .collect()
    }

    fn looks_real(value: &str) -> bool {
        if value.len() <= 8 {
            return false;
        }
        if PLACEHOLDER_VALUES.contains(&value.to_lowercase().as_str()) {
            return false;
        }
        if value.len() <= MAX_PLACEHOLDER_LEN
            && (value.starts_with("your_") || value.starts_with('<'))
        {
            return false;
        }
        true
    }

    fn first_real_value(&self, content: &str) -> Option<String> {
        self.parse_values(content)
            .into_iter()
            .find(|(_, value)| Self::looks_real(value))
            .map(|(key, _)| key)
    }
}

#[async_trait]
impl Scanner for EnvExposureScanner {
    fn id(&self) -> &'static str {
        "env_exposure"
    }

    fn kind(&self) -> ScannerKind {
        ScannerKind::Env
    }

    async fn scan(&self, files: &[FileRecord]) -> Result<Vec<RawFinding>> {
        let mut findings = Vec::new();

        let gitignore = files.iter().find(|f| f.path == ".gitignore");
        let env_file = files.iter().find(|f| f.path == ".env");
        let env_example = files.iter().find(|f| f.path.contains(".env.example"));

        let gitignore_ok = gitignore.map(|f| Self::env_ignored(&f.content)).unwrap_or(false);

        if let Some(env) = env_file {
            if !gitignore_ok {
                findings.push(RawFinding::Env {
                    path: ".env".to_string(),
                    issue: "dotenv_not_gitignored".to_string(),
                    detail: ".env is committed and not listed in .gitignore".to_string(),
                });
            }

            if let Some(key) = self.first_real_value(&env.content) {
                findings.push(RawFinding::Env {
                    path: ".env".to_string(),
                    issue: "dotenv_has_real_values".to_string(),
                    detail: format!("Key {key} has a non-placeholder value"),
                });
            }
        }

        if let Some(example) = env_example {
            if let Some(key) = self.first_real_value(&example.content) {
                findings.push(RawFinding::Env {
                    path: example.path.clone(),
                    issue: "dotenv_example_has_credentials".to_string(),
                    detail: format!(".env.example contains real-looking value for {key}"),
                });
            }
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_env_not_gitignored() {
        let scanner = EnvExposureScanner::new();
        let files = vec![
            FileRecord::new(".env", "API_KEY=placeholder\n"),
            FileRecord::new(".gitignore", "target/\n*.log\n"),
        ];

        let findings = scanner.scan(&files).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].issue(), Some("dotenv_not_gitignored"));
    }

    #[tokio::test]
    async fn test_gitignored_env_with_placeholders_is_clean() {
        let scanner = EnvExposureScanner::new();
        let files = vec![
            FileRecord::new(".env", "API_KEY=your_key_here\nDEBUG=true\n"),
            FileRecord::new(".gitignore", "# env files\n.env\n"),
        ];

        assert!(scanner.scan(&files).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_real_value_reported_once() {
        let scanner = EnvExposureScanner::new();
        let files = vec![
            FileRecord::new(
                ".env",
                "DB_PASSWORD=\"prod-pg-password-91\"\nSTRIPE_KEY=another-real-value-22\n",
            ),
            FileRecord::new(".gitignore", ".env\n"),
        ];

        let findings = scanner.scan(&files).await.unwrap();
        // First real value short-circuits; one finding for the whole file.
        assert_eq!(findings.len(), 1);
        match &findings[0] {
            RawFinding::Env { issue, detail, .. } => {
                assert_eq!(issue, "dotenv_has_real_values");
                assert!(detail.contains("DB_PASSWORD"));
            }
            other => panic!("unexpected finding: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_env_example_with_credentials() {
        let scanner = EnvExposureScanner::new();
        let files = vec![FileRecord::new(
            "config/.env.example",
            "TOKEN=ghp_realtokenvalue123456\n",
        )];

        let findings = scanner.scan(&files).await.unwrap();
        assert_eq!(findings.len(), 1);
        match &findings[0] {
            RawFinding::Env { path, issue, .. } => {
                assert_eq!(path, "config/.env.example");
                assert_eq!(issue, "dotenv_example_has_credentials");
            }
            other => panic!("unexpected finding: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_env_files_no_findings() {
        let scanner = EnvExposureScanner::new();
        let files = vec![FileRecord::new("README.md", "# hello\n")];
        assert!(scanner.scan(&files).await.unwrap().is_empty());
    }
}

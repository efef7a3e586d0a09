//! Static lookup from a finding's scanner/issue/pattern to a standard
//! remediation category and reference list.
//!
//! Resolution never fails: a missing or malformed table degrades to the
//! built-in default entry ("General Secure Coding", empty lists). The
//! shared table is parsed once from the embedded resource and never
//! mutated afterwards, so any number of pipeline invocations can read it
//! concurrently.

use crate::core::RawFinding;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::warn;

const DEFAULT_CATEGORY: &str = "General Secure Coding";
const UNKNOWN_VERSION: &str = "unknown";

static STANDARD_MAPPING_JSON: &str = include_str!("standard_mapping.json");
static SHARED_TABLE: OnceLock<Arc<MappingTable>> = OnceLock::new();

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingEntry {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owasp_category: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub owasp_refs: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub standard_fix_requirements: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerMap {
    #[serde(default)]
    pub by_issue: HashMap<String, MappingEntry>,

    #[serde(default)]
    pub by_pattern_name: HashMap<String, MappingEntry>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default: Option<MappingEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingTable {
    #[serde(default)]
    pub by_scanner: HashMap<String, ScannerMap>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default: Option<MappingEntry>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mapping_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_reviewed: Option<String>,
}

/// Mapping fields attached to a prioritized finding, flattened into its
/// wire representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedMapping {
    pub owasp_category: String,
    pub owasp_refs: Vec<String>,
    pub standard_fix_requirements: Vec<String>,
    pub owasp_mapping_version: String,
    pub owasp_mapping_last_reviewed: String,
}

impl MappingTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The process-wide table, parsed from the embedded resource on
    /// first use. A malformed resource degrades to the empty table.
    pub fn shared() -> Arc<Self> {
        SHARED_TABLE
            .get_or_init(|| {
                let table = match Self::from_json_str(STANDARD_MAPPING_JSON) {
                    Ok(table) => table,
                    Err(e) => {
                        warn!("embedded mapping table failed to parse: {e}");
                        Self::empty()
                    }
                };
                Arc::new(table)
            })
            .clone()
    }

    /// Priority order: scanner+issue, scanner+pattern name, scanner
    /// default, global default. First match wins; no merging across
    /// levels. Total over every finding.
    pub fn resolve(&self, finding: &RawFinding) -> ResolvedMapping {
        let entry = self.lookup(finding);
        let non_blank = |values: &[String]| -> Vec<String> {
            values
                .iter()
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .collect()
        };

        ResolvedMapping {
            owasp_category: entry
                .and_then(|e| e.owasp_category.clone())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            owasp_refs: entry.map(|e| non_blank(&e.owasp_refs)).unwrap_or_default(),
            standard_fix_requirements: entry
                .map(|e| non_blank(&e.standard_fix_requirements))
                .unwrap_or_default(),
            owasp_mapping_version: self
                .mapping_version
                .clone()
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            owasp_mapping_last_reviewed: self
                .last_reviewed
                .clone()
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
        }
    }

    fn lookup(&self, finding: &RawFinding) -> Option<&MappingEntry> {
        let scanner_map = self.by_scanner.get(finding.kind().as_str());

        if let Some(map) = scanner_map {
            if let Some(entry) = finding.issue().and_then(|issue| map.by_issue.get(issue)) {
                return Some(entry);
            }
            if let Some(entry) = finding
                .pattern_name()
                .and_then(|name| map.by_pattern_name.get(name))
            {
                return Some(entry);
            }
            if let Some(entry) = map.default.as_ref() {
                return Some(entry);
            }
        }

        self.default.as_ref()
    }
}

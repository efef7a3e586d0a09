//! Independent detectors over an immutable file set.
//!
//! Each scanner is a pure function of the `{path, content}` records it
//! receives (plus, for the dependency scanner, its own vulnerability
//! database lookups) and emits zero or more [`RawFinding`]s. Scanners
//! are fail-open: the runner logs an `Err` and moves on, so one broken
//! detector never aborts the pipeline. Concatenation order across
//! scanners is fixed (secrets, env, dependencies) and matters only as a
//! tie-break in the deterministic fallback.

pub mod dependencies;
pub mod env_exposure;
pub mod secrets;

use crate::core::{FileRecord, RawFinding, ScannerKind};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Scanner: Send + Sync {
    fn id(&self) -> &'static str;

    fn kind(&self) -> ScannerKind;

    async fn scan(&self, files: &[FileRecord]) -> Result<Vec<RawFinding>>;
}

pub use dependencies::DependencyScanner;
pub use env_exposure::EnvExposureScanner;
pub use secrets::SecretsScanner;

/// The standard detector set in fixed concatenation order.
pub fn default_scanners() -> Vec<Box<dyn Scanner>> {
    vec![
        Box::new(SecretsScanner::new()),
        Box::new(EnvExposureScanner::new()),
        Box::new(DependencyScanner::new()),
    ]
}

//! Seiri Scanners - security finding triage pipeline
//!
//! Normalizes raw scanner output into a common finding model, ranks the
//! findings with an LLM-backed triage engine (with a deterministic
//! fallback), enriches them against a standard OWASP-style mapping, and
//! renders a fixer-oriented markdown report.

pub mod core;
pub mod mapping;
pub mod report;
pub mod runner;
pub mod scanners;
pub mod triage;

pub use core::{
    AnalysisMeta, FileRecord, PrioritizedFinding, PrioritizedResult, RawFinding, ScannerKind,
    Severity, TriagePath,
};

pub use mapping::{MappingTable, ResolvedMapping};

pub use report::ReportRenderer;

pub use runner::{Pipeline, ScanOutcome};

pub use scanners::{
    default_scanners, DependencyScanner, EnvExposureScanner, Scanner, SecretsScanner,
};

pub use triage::{
    MockTriageProvider, OpenAIProvider, TriageConfig, TriageEngine, TriageProvider,
    MAX_PRIORITIZED,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

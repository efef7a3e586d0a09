pub mod finding;
pub mod severity;

pub use finding::{
    AnalysisMeta, FileRecord, PrioritizedFinding, PrioritizedResult, RawFinding, ScannerKind,
    TriagePath,
};
pub use severity::Severity;

//! Prioritization of raw findings.
//!
//! The engine asks an LLM to rank findings by real-world risk and emit a
//! structured remediation plan, then validates and maps that plan back
//! onto the raw findings. When no credential is configured, the request
//! fails, or the plan is unusable, a deterministic fallback ranking
//! produces the result instead. The chosen path is always recorded in
//! the result's analysis metadata.

pub mod engine;
pub mod plan;
pub mod prompts;
pub mod provider;

pub mod mock_provider;

pub use engine::{TriageEngine, MAX_PRIORITIZED};
pub use mock_provider::MockTriageProvider;
pub use plan::{extract_developer_summary, extract_json_block, PlanItem, RequiredChanges};
pub use prompts::{build_user_prompt, SYSTEM_PROMPT};
pub use provider::{
    OpenAIProvider, TriageConfig, TriageError, TriageProvider, TriageRequest, TriageResponse,
    DEFAULT_MODEL_CANDIDATES,
};

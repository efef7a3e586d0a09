//! The prioritization state machine.
//!
//! Start → CheckCredential → RequestLoop → ParseResponse → ValidatePlan
//! → MapItems → Finalize. Every failure branch terminates in the
//! deterministic fallback ranking, so the engine always returns a valid
//! [`PrioritizedResult`] and never propagates an error to the caller.

use crate::core::{
    AnalysisMeta, PrioritizedFinding, PrioritizedResult, RawFinding, TriagePath,
};
use crate::mapping::MappingTable;
use crate::triage::plan::{extract_developer_summary, extract_json_block, PlanItem};
use crate::triage::prompts::{build_user_prompt, SYSTEM_PROMPT};
use crate::triage::provider::{OpenAIProvider, TriageConfig, TriageProvider, TriageRequest};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hard cap on prioritized findings, matching the prompt contract.
pub const MAX_PRIORITIZED: usize = 5;

const GENERIC_RISK: &str = "Fix this issue to reduce security risk.";
const GENERIC_STEP: &str = "Address the finding as described in the evidence.";
const GENERIC_VERIFY: &str = "Confirm the issue is resolved.";

const ERROR_DETAIL_LIMIT: usize = 280;

pub struct TriageEngine {
    providers: Vec<Arc<dyn TriageProvider>>,
    mapping: Arc<MappingTable>,
    temperature: f32,
    max_tokens: u32,
}

impl TriageEngine {
    pub fn new(providers: Vec<Arc<dyn TriageProvider>>) -> Self {
        Self {
            providers,
            mapping: MappingTable::shared(),
            temperature: 0.0,
            max_tokens: 4096,
        }
    }

    /// Builds the ordered candidate list from configuration. No
    /// credential means no providers, which selects the
    /// `missing_api_key` branch on the first run.
    pub fn from_config(config: &TriageConfig) -> Self {
        let providers: Vec<Arc<dyn TriageProvider>> = match &config.api_key {
            Some(key) => config
                .model_candidates
                .iter()
                .map(|model| {
                    Arc::new(OpenAIProvider::new(key, model.clone())) as Arc<dyn TriageProvider>
                })
                .collect(),
            None => Vec::new(),
        };

        let mut engine = Self::new(providers);
        engine.temperature = config.temperature;
        engine.max_tokens = config.max_tokens;
        engine
    }

    pub fn from_env() -> Self {
        Self::from_config(&TriageConfig::from_env())
    }

    pub fn with_mapping(mut self, mapping: Arc<MappingTable>) -> Self {
        self.mapping = mapping;
        self
    }

    pub async fn prioritize(&self, raw_findings: &[RawFinding]) -> PrioritizedResult {
        if raw_findings.is_empty() {
            return PrioritizedResult {
                findings: Vec::new(),
                developer_summary: None,
                analysis_meta: Some(AnalysisMeta {
                    path: TriagePath::NoFindings,
                    model: None,
                    reason_detail: None,
                    raw_findings: 0,
                    raw_plan_items: None,
                    mapped_findings: 0,
                }),
            };
        }

        if self.providers.is_empty() {
            warn!("triage credential missing; using deterministic fallback");
            return self.fallback(raw_findings, TriagePath::MissingApiKey, None, None);
        }

        let request = TriageRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: build_user_prompt(raw_findings),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut response = None;
        let mut last_error_detail = None;
        for provider in &self.providers {
            match provider.triage(request.clone()).await {
                Ok(r) => {
                    debug!("triage succeeded with model {}", provider.model_name());
                    response = Some(r);
                    break;
                }
                Err(e) => {
                    warn!("triage request failed for model {}: {e}", provider.model_name());
                    last_error_detail = Some(truncate_detail(&e.to_string()));
                }
            }
        }

        let Some(response) = response else {
            let candidates = self
                .providers
                .iter()
                .map(|p| p.model_name().to_string())
                .collect::<Vec<_>>()
                .join(",");
            return self.fallback(
                raw_findings,
                TriagePath::ProviderRequestFailed,
                Some(candidates),
                last_error_detail,
            );
        };

        let model = Some(response.model.clone());

        let Some(data) = extract_json_block(&response.content) else {
            warn!(
                "unable to parse remediation_plan JSON; response preview={}",
                preview(&response.content)
            );
            return self.fallback(
                raw_findings,
                TriagePath::ParseFailedOrMissingRemediationPlan,
                model,
                None,
            );
        };

        let Some(plan) = data.get("remediation_plan") else {
            warn!("response JSON carries no remediation_plan");
            return self.fallback(
                raw_findings,
                TriagePath::ParseFailedOrMissingRemediationPlan,
                model,
                None,
            );
        };

        let plan_items = match plan.as_array() {
            Some(items) if !items.is_empty() => items,
            _ => {
                warn!("remediation_plan is empty or not an array");
                return self.fallback(raw_findings, TriagePath::EmptyRemediationPlan, model, None);
            }
        };

        let developer_summary = extract_developer_summary(&response.content);

        let mut mapped = Vec::new();
        let mut seen_ids = HashSet::new();
        for value in plan_items {
            let Some(item) = PlanItem::from_value(value) else {
                continue;
            };
            let Some(index) = item.finding_index() else {
                warn!("invalid finding_id={} in remediation plan item", item.finding_id);
                continue;
            };
            if index >= raw_findings.len() {
                warn!(
                    "finding_id out of range={index} (findings={})",
                    raw_findings.len()
                );
                continue;
            }
            if !seen_ids.insert(index) {
                warn!("duplicate finding_id={index} in remediation plan; discarding");
                continue;
            }
            mapped.push(self.map_item(&raw_findings[index], &item, index));
            if mapped.len() == MAX_PRIORITIZED {
                break;
            }
        }

        if mapped.is_empty() {
            warn!("no valid remediation items after mapping; using fallback");
            return self.fallback(
                raw_findings,
                TriagePath::NoValidFindingIdsFromPlan,
                model,
                None,
            );
        }

        mapped.sort_by_key(|f| f.order);
        let mapped_count = mapped.len();

        PrioritizedResult {
            findings: mapped,
            developer_summary,
            analysis_meta: Some(AnalysisMeta {
                path: TriagePath::Ok,
                model,
                reason_detail: None,
                raw_findings: raw_findings.len(),
                raw_plan_items: Some(plan_items.len()),
                mapped_findings: mapped_count,
            }),
        }
    }

    fn map_item(&self, raw: &RawFinding, item: &PlanItem, index: usize) -> PrioritizedFinding {
        let instructions = item
            .required_changes
            .as_ref()
            .map(|rc| rc.implementation_instructions.as_str())
            .unwrap_or("");
        let mut fix_steps: Vec<String> = instructions
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if fix_steps.is_empty() {
            fix_steps.push(GENERIC_STEP.to_string());
        }

        let mut risk = item.root_cause.trim().to_string();
        let exploitation = item.exploitation_path.trim();
        if !exploitation.is_empty() {
            if risk.is_empty() {
                risk = exploitation.to_string();
            } else {
                risk = format!("{risk} {exploitation}");
            }
        }
        if risk.is_empty() {
            risk = GENERIC_RISK.to_string();
        }

        let verify = if item.verification_steps.trim().is_empty() {
            GENERIC_VERIFY.to_string()
        } else {
            item.verification_steps.trim().to_string()
        };

        PrioritizedFinding {
            finding: raw.clone(),
            order: index,
            risk_explanation: risk,
            fix_steps,
            verify,
            mapping: self.mapping.resolve(raw),
        }
    }

    /// Deterministic ranking used on every failure branch: stable sort
    /// by (scanner rank, path), first five, generic narrative.
    /// Byte-for-byte reproducible for identical input.
    fn fallback(
        &self,
        raw_findings: &[RawFinding],
        path: TriagePath,
        model: Option<String>,
        reason_detail: Option<String>,
    ) -> PrioritizedResult {
        let mut sorted: Vec<&RawFinding> = raw_findings.iter().collect();
        sorted.sort_by(|a, b| {
            (a.kind().fallback_rank(), a.path().unwrap_or(""))
                .cmp(&(b.kind().fallback_rank(), b.path().unwrap_or("")))
        });

        let findings: Vec<PrioritizedFinding> = sorted
            .into_iter()
            .take(MAX_PRIORITIZED)
            .enumerate()
            .map(|(order, raw)| PrioritizedFinding {
                finding: raw.clone(),
                order,
                risk_explanation: GENERIC_RISK.to_string(),
                fix_steps: vec![GENERIC_STEP.to_string()],
                verify: GENERIC_VERIFY.to_string(),
                mapping: self.mapping.resolve(raw),
            })
            .collect();

        let mapped = findings.len();
        PrioritizedResult {
            findings,
            developer_summary: None,
            analysis_meta: Some(AnalysisMeta {
                path,
                model,
                reason_detail,
                raw_findings: raw_findings.len(),
                raw_plan_items: None,
                mapped_findings: mapped,
            }),
        }
    }
}

fn truncate_detail(detail: &str) -> String {
    let detail = detail.trim();
    if detail.is_empty() {
        return "unknown_error".to_string();
    }
    if detail.chars().count() > ERROR_DETAIL_LIMIT {
        let clipped: String = detail.chars().take(ERROR_DETAIL_LIMIT).collect();
        format!("{clipped}...")
    } else {
        detail.to_string()
    }
}

fn preview(text: &str) -> String {
    text.chars().take(600).collect::<String>().replace('\n', "\\n")
}

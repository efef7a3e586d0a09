//! Fixed prompt text for the triage provider.

use crate::core::RawFinding;

pub const SYSTEM_PROMPT: &str = r#"You are a senior application security engineer reviewing automated scanner findings for a solo developer's project.

Task:
- Identify and sort findings by real-world risk (likelihood × impact).
- Return at most the top 5 highest-risk findings.
- If fewer than 5 exist, return only those present.
- Do not invent findings.
- Assume the application is internet-facing.

Output Format (Strict):
Your response must contain exactly two sections:
1. A Markdown-formatted developer summary (plain English, non-technical). For each finding include: Title, What this is, How it would be exploited, Business impact. Do not use: consider, might, could.
2. A single fenced JSON code block containing ONLY the remediation plan. No markdown outside the block. No text after the JSON block.

JSON schema for the remediation_plan:
{
  "remediation_plan": [
    {
      "finding_id": 0,
      "title": "",
      "root_cause": "",
      "exploitation_path": "",
      "required_changes": {
        "files_to_modify": [],
        "change_type": "",
        "implementation_instructions": ""
      },
      "acceptance_criteria": "",
      "verification_steps": ""
    }
  ]
}
Rules: Valid JSON only. No trailing commas. No comments. Maximum 5 findings. finding_id is the 0-based index of the finding in the raw findings array."#;

/// Serializes the raw findings into the user message. `finding_id`s in
/// the remediation plan refer back to indices in this array.
pub fn build_user_prompt(raw_findings: &[RawFinding]) -> String {
    let payload = serde_json::to_string_pretty(raw_findings)
        .unwrap_or_else(|_| "[]".to_string());
    format!(
        "Raw findings (finding_id = 0-based index):\n{payload}\n\n\
         Return Section 1 (Markdown developer summary), then Section 2 \
         (single ```json code block with remediation_plan only, max 5 items)."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_embeds_findings() {
        let findings = vec![RawFinding::Env {
            path: ".env".to_string(),
            issue: "dotenv_not_gitignored".to_string(),
            detail: "committed".to_string(),
        }];

        let prompt = build_user_prompt(&findings);
        assert!(prompt.contains("\"scanner\": \"env\""));
        assert!(prompt.contains("dotenv_not_gitignored"));
        assert!(prompt.contains("0-based index"));
    }

    #[test]
    fn test_system_prompt_pins_contract() {
        assert!(SYSTEM_PROMPT.contains("at most the top 5"));
        assert!(SYSTEM_PROMPT.contains("Do not invent findings"));
        assert!(SYSTEM_PROMPT.contains("remediation_plan"));
    }
}

//! Provider-response parsing: JSON extraction, remediation-plan items,
//! and developer-summary splitting.
//!
//! Models are told to return a fenced JSON block, but they sometimes
//! return bare JSON or wrap it in prose, so extraction tries the fence
//! first and falls back to the outermost brace span. Individual plan
//! items are validated leniently: a malformed item is discarded, never
//! fatal to the whole response.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Everything before the first code-fence delimiter, trimmed. Absent
/// when there is no fence or nothing precedes it. Pure text split,
/// independent of whether the JSON plan parses.
pub fn extract_developer_summary(text: &str) -> Option<String> {
    let prefix = text.split("```").next()?;
    if !text.contains("```") {
        return None;
    }
    let summary = prefix.trim();
    if summary.is_empty() {
        None
    } else {
        Some(summary.to_string())
    }
}

/// Extracts a JSON object from response text: fenced code block first
/// (with or without a `json` tag), else the span from the first `{` to
/// the last `}`.
pub fn extract_json_block(text: &str) -> Option<Value> {
    if let Some(inner) = fenced_block(text) {
        if let Ok(value) = serde_json::from_str::<Value>(inner.trim()) {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let mut body_start = open + 3;
    if text[body_start..].starts_with("json") {
        body_start += 4;
    }
    let close = text[body_start..].find("```")?;
    Some(&text[body_start..body_start + close])
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequiredChanges {
    #[serde(default)]
    pub files_to_modify: Vec<String>,

    #[serde(default)]
    pub change_type: String,

    #[serde(default)]
    pub implementation_instructions: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanItem {
    #[serde(default)]
    pub finding_id: Value,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub root_cause: String,

    #[serde(default)]
    pub exploitation_path: String,

    #[serde(default)]
    pub required_changes: Option<RequiredChanges>,

    #[serde(default)]
    pub acceptance_criteria: String,

    #[serde(default)]
    pub verification_steps: String,
}

impl PlanItem {
    /// Deserializes one plan entry; anything that is not an object is
    /// discarded.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            warn!("remediation plan item is not an object; discarding");
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Coerces `finding_id` to a non-negative index. Integer JSON
    /// numbers, integral floats, and integer-valued strings are
    /// accepted; everything else is rejected.
    pub fn finding_index(&self) -> Option<usize> {
        let id = match &self.finding_id {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i
                } else {
                    let f = n.as_f64()?;
                    if f.fract() != 0.0 {
                        return None;
                    }
                    f as i64
                }
            }
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            _ => return None,
        };
        usize::try_from(id).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_json_extraction() {
        let text = "Summary here.\n```json\n{\"remediation_plan\": []}\n```";
        let value = extract_json_block(text).unwrap();
        assert!(value["remediation_plan"].is_array());
    }

    #[test]
    fn test_unfenced_json_extraction() {
        let text = "Here is the plan: {\"remediation_plan\": [{\"finding_id\": 0}]} done";
        let value = extract_json_block(text).unwrap();
        assert_eq!(value["remediation_plan"][0]["finding_id"], 0);
    }

    #[test]
    fn test_untagged_fence() {
        let text = "```\n{\"remediation_plan\": []}\n```";
        assert!(extract_json_block(text).is_some());
    }

    #[test]
    fn test_garbage_yields_none() {
        assert!(extract_json_block("no json here").is_none());
        assert!(extract_json_block("{broken").is_none());
    }

    #[test]
    fn test_developer_summary_split() {
        let text = "Two findings need attention.\n\n```json\n{}\n```";
        assert_eq!(
            extract_developer_summary(text).as_deref(),
            Some("Two findings need attention.")
        );
    }

    #[test]
    fn test_developer_summary_absent_without_fence() {
        assert!(extract_developer_summary("plain text only").is_none());
    }

    #[test]
    fn test_developer_summary_absent_when_fence_leads() {
        assert!(extract_developer_summary("```json\n{}\n```").is_none());
    }

    #[test]
    fn test_finding_index_coercion() {
        let item = |id: Value| PlanItem {
            finding_id: id,
            ..Default::default()
        };

        assert_eq!(item(json!(2)).finding_index(), Some(2));
        assert_eq!(item(json!(2.0)).finding_index(), Some(2));
        assert_eq!(item(json!("3")).finding_index(), Some(3));
        assert_eq!(item(json!(-1)).finding_index(), None);
        assert_eq!(item(json!(2.7)).finding_index(), None);
        assert_eq!(item(json!("abc")).finding_index(), None);
        assert_eq!(item(Value::Null).finding_index(), None);
        assert_eq!(item(json!([1])).finding_index(), None);
    }

    #[test]
    fn test_plan_item_from_non_object_discarded() {
        assert!(PlanItem::from_value(&json!("not an object")).is_none());
        assert!(PlanItem::from_value(&json!({"finding_id": 1})).is_some());
    }
}

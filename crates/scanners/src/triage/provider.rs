//! Triage-provider boundary: one synchronous round trip per candidate
//! model, no internal retries. Retry policy lives entirely in the
//! engine's ordered candidate list.

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("API error: {0}")]
    Api(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct TriageRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct TriageResponse {
    pub content: String,
    pub model: String,
}

#[async_trait]
pub trait TriageProvider: Send + Sync {
    async fn triage(&self, request: TriageRequest) -> Result<TriageResponse, TriageError>;

    fn model_name(&self) -> &str;
}

/// Environment-sourced provider settings. The credential-presence signal
/// for the engine's CheckCredential branch comes from here.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub api_key: Option<String>,
    pub model_candidates: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub const DEFAULT_MODEL_CANDIDATES: &[&str] = &["gpt-4o-mini", "gpt-4.1-mini", "gpt-4o"];

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_candidates: DEFAULT_MODEL_CANDIDATES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            temperature: 0.0,
            max_tokens: 4096,
        }
    }
}

impl TriageConfig {
    /// Reads `OPENAI_API_KEY` and `OPENAI_MODEL`. Keys pasted with
    /// surrounding quotes are tolerated. A configured model replaces the
    /// whole default candidate list.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|key| key.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
            .filter(|key| !key.is_empty());

        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            let model = model.trim().to_string();
            if !model.is_empty() {
                config.model_candidates = vec![model];
            }
        }

        config
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIProvider {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }
}

#[async_trait]
impl TriageProvider for OpenAIProvider {
    async fn triage(&self, request: TriageRequest) -> Result<TriageResponse, TriageError> {
        debug!("sending triage request to model {}", self.model);

        let system_message = ChatCompletionRequestSystemMessage {
            content: request.system_prompt.clone(),
            ..Default::default()
        };
        let user_message = ChatCompletionRequestUserMessage {
            content: async_openai::types::ChatCompletionRequestUserMessageContent::Text(
                request.user_prompt.clone(),
            ),
            ..Default::default()
        };

        let api_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(request.temperature)
            .max_tokens(u16::try_from(request.max_tokens).unwrap_or(u16::MAX))
            .messages(vec![
                ChatCompletionRequestMessage::System(system_message),
                ChatCompletionRequestMessage::User(user_message),
            ])
            .build()
            .map_err(|e| TriageError::Api(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(api_request)
            .await
            .map_err(|e| TriageError::Api(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| TriageError::InvalidResponse("no content in response".to_string()))?;

        debug!("received {} bytes from {}", content.len(), response.model);

        Ok(TriageResponse {
            content,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_candidates() {
        let config = TriageConfig::default();
        assert_eq!(
            config.model_candidates,
            vec!["gpt-4o-mini", "gpt-4.1-mini", "gpt-4o"]
        );
        assert!(!config.has_credential());
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn test_default_token_budget_fits_builder_width() {
        // The chat-completion builder takes a u16 token budget; the
        // default must convert without clamping.
        let config = TriageConfig::default();
        assert_eq!(u16::try_from(config.max_tokens), Ok(4096));
        assert_eq!(u16::try_from(u32::from(u16::MAX) + 1).unwrap_or(u16::MAX), u16::MAX);
    }

    #[test]
    fn test_provider_model_name() {
        let provider = OpenAIProvider::new("test-key", "gpt-4o-mini");
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }
}

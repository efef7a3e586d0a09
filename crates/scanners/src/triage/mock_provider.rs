use crate::triage::provider::{TriageError, TriageProvider, TriageRequest, TriageResponse};
use async_trait::async_trait;

/// Scripted provider for tests. Returns a fixed response body, or a
/// configured error, and counts calls so candidate-loop behavior can be
/// asserted.
pub struct MockTriageProvider {
    content: String,
    model: String,
    call_count: std::sync::atomic::AtomicUsize,
    should_fail: bool,
}

impl MockTriageProvider {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: "mock-model".to_string(),
            call_count: std::sync::atomic::AtomicUsize::new(0),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        let mut provider = Self::new("");
        provider.should_fail = true;
        provider
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn reset_count(&self) {
        self.call_count
            .store(0, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl TriageProvider for MockTriageProvider {
    async fn triage(&self, _request: TriageRequest) -> Result<TriageResponse, TriageError> {
        self.call_count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if self.should_fail {
            return Err(TriageError::Api(
                "mock provider configured to fail".to_string(),
            ));
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;

        Ok(TriageResponse {
            content: self.content.clone(),
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

    #[tokio::test]
    async fn test_mock_provider_call_counting() {
        let provider = MockTriageProvider::new("hello");
        assert_eq!(provider.call_count(), 0);

        let request = TriageRequest {
            system_prompt: "test".to_string(),
            user_prompt: "test".to_string(),
            temperature: 0.0,
            max_tokens: 64,
        };

        provider.triage(request.clone()).await.unwrap();
        provider.triage(request).await.unwrap();
        assert_eq!(provider.call_count(), 2);

        provider.reset_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_failure() {
        let provider = MockTriageProvider::failing();

        let request = TriageRequest {
            system_prompt: "test".to_string(),
            user_prompt: "test".to_string(),
            temperature: 0.0,
            max_tokens: 64,
        };

        let result = provider.triage(request).await;
        assert!(result.is_err());
        assert_eq!(provider.call_count(), 1);
    }
}

use super::backend::InsightBackend;
use super::error::InsightError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted backend that replays queued responses and records prompts
pub struct MockInsightBackend {
    responses: Mutex<VecDeque<Result<String, InsightError>>>,
    prompts: Mutex<Vec<String>>,
    model: String,
}

impl MockInsightBackend {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            model: "mock-model".to_string(),
        }
    }

    /// A backend that answers every queued request with `text`
    pub fn with_text(text: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.add_text(text);
        mock
    }

    /// A backend whose first request fails with `error`
    pub fn with_error(error: InsightError) -> Self {
        let mock = Self::new();
        mock.add_error(error);
        mock
    }

    pub fn add_text(&self, text: impl Into<String>) {
        self.lock_responses().push_back(Ok(text.into()));
    }

    pub fn add_error(&self, error: InsightError) {
        self.lock_responses().push_back(Err(error));
    }

    /// Number of `generate` calls made so far
    pub fn call_count(&self) -> usize {
        self.lock_prompts().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.lock_prompts().clone()
    }

    pub fn remaining_responses(&self) -> usize {
        self.lock_responses().len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, InsightError>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_prompts(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockInsightBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InsightBackend for MockInsightBackend {
    async fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        self.lock_prompts().push(prompt.to_string());
        self.lock_responses()
            .pop_front()
            .unwrap_or_else(|| {
                Err(InsightError::InvalidResponse {
                    message: "MockInsightBackend: No more responses in queue".to_string(),
                })
            })
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

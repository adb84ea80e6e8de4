//! Insight backend abstraction
//!
//! The pipeline talks to the language model through [`InsightBackend`], so
//! the Ollama client can be swapped for a scripted mock in tests.

use super::error::InsightError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Free-text commentary about a fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub text: String,

    /// Model that produced the text, or `"provided"` for user-supplied text
    pub model: String,
}

impl Insight {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
        }
    }

    /// Text supplied by the user rather than generated
    pub fn provided(text: impl Into<String>) -> Self {
        Self::new(text, "provided")
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Non-empty trimmed lines, in order
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// A language model that turns a prompt into commentary
#[async_trait]
pub trait InsightBackend: Send + Sync {
    /// Sends a single completion request and returns the generated text
    /// verbatim.
    async fn generate(&self, prompt: &str) -> Result<String, InsightError>;

    /// Short backend name, e.g. `"ollama"`
    fn name(&self) -> &str;

    /// Model identifier passed to the backend
    fn model(&self) -> &str;

    /// Model and endpoint details for logging
    fn model_info(&self) -> Option<String> {
        None
    }
}

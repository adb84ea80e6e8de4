//! Insight generation
//!
//! The second pipeline stage: hand the fingerprint to a local language model
//! and return its commentary verbatim.

mod backend;
mod error;
mod mock;
mod ollama;
mod prompt;

pub use backend::{Insight, InsightBackend};
pub use error::InsightError;
pub use mock::MockInsightBackend;
pub use ollama::{ChunkSink, OllamaClient, OllamaHealth};
pub use prompt::build_insight_prompt;

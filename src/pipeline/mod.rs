//! Pipeline orchestration
//!
//! Runs the three stages in order: fingerprint lookup, insight generation,
//! spreadsheet export. Each stage is awaited before the next starts.

mod error;
mod orchestrator;

pub use error::PipelineError;
pub use orchestrator::{Pipeline, RunOutcome, RunRequest};

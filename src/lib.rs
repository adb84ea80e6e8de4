//! stackprobe - technology fingerprinting with local LLM analysis
//!
//! Looks up the technologies a domain uses through the BuiltWith API, asks a
//! locally running Ollama model for commentary, and writes both to an
//! `.xlsx` spreadsheet.
//!
//! # Pipeline
//!
//! - [`fingerprint`]: BuiltWith client and response parsing
//! - [`insight`]: Ollama client behind the [`InsightBackend`] trait
//! - [`report`]: flattening into rows and writing the workbook
//! - [`pipeline`]: runs the three stages in order
//!
//! # Example
//!
//! ```no_run
//! use stackprobe::{BuiltWithClient, OllamaClient, Pipeline, RunRequest, StackprobeConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StackprobeConfig::load()?;
//! let pipeline = Pipeline::new(Arc::new(BuiltWithClient::from_config(&config)?))
//!     .with_insight(Arc::new(OllamaClient::from_config(&config)?));
//!
//! let outcome = pipeline
//!     .run(RunRequest::new("example.com").with_export("example_com_analysis.xlsx"))
//!     .await?;
//! println!("{} rows written", outcome.report.map(|r| r.rows).unwrap_or(0));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod fingerprint;
pub mod insight;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod util;

pub use config::{ConfigError, StackprobeConfig};
pub use fingerprint::{
    BuiltWithClient, FingerprintError, FingerprintResult, FingerprintSource, SavedResponse,
};
pub use insight::{Insight, InsightBackend, InsightError, OllamaClient};
pub use pipeline::{Pipeline, PipelineError, RunOutcome, RunRequest};
pub use report::{ReportError, ReportRow, ReportSummary, ReportWriter};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_stackprobe() {
        assert_eq!(NAME, "stackprobe");
    }
}

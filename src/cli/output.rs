//! Output formatting for run summaries and health checks
//!
//! Human output is meant for a terminal; JSON and YAML carry the same data
//! for scripts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pipeline::RunOutcome;

const RULE_WIDTH: usize = 80;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Availability of one dependency of the tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub available: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HealthStatus {
    pub fn available(message: impl Into<String>) -> Self {
        Self {
            available: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            available: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Formatter for command results
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a pipeline outcome. `include_insight` is false when the
    /// insight was already streamed to the terminal.
    pub fn format_run(&self, outcome: &RunOutcome, include_insight: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcome)
                .context("Failed to serialize run result to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(outcome).context("Failed to serialize run result to YAML")
            }
            OutputFormat::Human => Ok(self.format_run_human(outcome, include_insight)),
        }
    }

    pub fn format_health(&self, results: &BTreeMap<String, HealthStatus>) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(results)
                .context("Failed to serialize health status to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(results).context("Failed to serialize health status to YAML")
            }
            OutputFormat::Human => Ok(self.format_health_human(results)),
        }
    }

    fn format_run_human(&self, outcome: &RunOutcome, include_insight: bool) -> String {
        let fingerprint = &outcome.fingerprint;
        let mut output = String::new();

        output.push_str(&format!("Domain: {}\n", fingerprint.domain));
        output.push_str(&format!(
            "Technologies: {} across {} categories\n",
            fingerprint.item_count(),
            fingerprint.categories.len()
        ));

        for category in &fingerprint.categories {
            output.push_str(&format!("\n  {}\n", category.name));
            for item in &category.items {
                match &item.subcategory {
                    Some(sub) => output.push_str(&format!(
                        "    - {} [{}] ({})\n",
                        item.name, sub, item.status
                    )),
                    None => output.push_str(&format!("    - {} ({})\n", item.name, item.status)),
                }
            }
        }

        if fingerprint.has_errors() {
            output.push_str(&format!(
                "\nBuiltWith reported {} error(s); results may be incomplete\n",
                fingerprint.errors.len()
            ));
        }

        if let (Some(insight), true) = (&outcome.insight, include_insight) {
            let rule = "=".repeat(RULE_WIDTH);
            output.push_str(&format!("\n{}\n", rule));
            output.push_str(&format!("Ollama Analysis ({}):\n", insight.model));
            output.push_str(&format!("{}\n", rule));
            output.push_str(insight.text.trim_end());
            output.push_str(&format!("\n{}\n", rule));
        }

        if let Some(report) = &outcome.report {
            output.push_str(&format!(
                "\nSuccessfully created Excel file: {}\n",
                report.path.display()
            ));
            output.push_str(&format!("  - Technology rows: {}\n", report.rows));
            let appended = if report.insight_included {
                "Yes".to_string()
            } else {
                match &outcome.insight_error {
                    Some(reason) => format!("No ({})", reason),
                    None => "No".to_string(),
                }
            };
            output.push_str(&format!("  - Ollama analysis appended: {}\n", appended));
        }

        output
    }

    fn format_health_human(&self, results: &BTreeMap<String, HealthStatus>) -> String {
        let mut output = String::new();

        output.push_str("Health Status\n");
        output.push_str(&"\u{2501}".repeat(42));
        output.push_str("\n\n");

        for (name, status) in results {
            let symbol = if status.available {
                "\u{2713}"
            } else {
                "\u{2717}"
            };

            output.push_str(&format!("{} {}\n", symbol, name));
            output.push_str(&format!(
                "  Status: {}\n",
                if status.available {
                    "Available"
                } else {
                    "Unavailable"
                }
            ));
            output.push_str(&format!("  Message: {}\n", status.message));
            if let Some(details) = &status.details {
                output.push_str(&format!("  Details: {}\n", details));
            }
            output.push('\n');
        }

        output
    }
}

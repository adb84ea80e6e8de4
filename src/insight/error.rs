//! Insight generation errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur while generating an insight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightError {
    /// The inference service could not be reached
    ModelUnavailable { endpoint: String, message: String },

    /// The service is up but does not have the requested model
    ModelNotFound { model: String },

    /// Generation did not finish within the configured timeout (in seconds)
    Timeout { seconds: u64 },

    /// Non-success status from the service
    Api {
        message: String,
        status_code: Option<u16>,
    },

    /// Response body could not be decoded
    InvalidResponse { message: String },

    /// Client could not be set up
    Configuration { message: String },
}

impl fmt::Display for InsightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightError::ModelUnavailable { endpoint, message } => {
                write!(f, "Model service unavailable at {}: {}", endpoint, message)
            }
            InsightError::ModelNotFound { model } => {
                write!(
                    f,
                    "Model '{}' not found. Please pull it with: ollama pull {}",
                    model, model
                )
            }
            InsightError::Timeout { seconds } => {
                write!(f, "Generation timed out after {} seconds", seconds)
            }
            InsightError::Api {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            InsightError::InvalidResponse { message } => {
                write!(f, "Invalid response from model service: {}", message)
            }
            InsightError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
        }
    }
}

impl std::error::Error for InsightError {}

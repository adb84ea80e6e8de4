use crate::fingerprint::FingerprintError;
use crate::insight::InsightError;
use crate::report::ReportError;
use thiserror::Error;

/// Errors that stop a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Fingerprint lookup failed: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Insight generation failed: {0}")]
    Insight(#[from] InsightError),

    #[error("Report export failed: {0}")]
    Report(#[from] ReportError),
}

impl PipelineError {
    /// Process exit code for this error: 2 for bad input, 1 for stage failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::InvalidDomain(_) => 2,
            _ => 1,
        }
    }

    /// Troubleshooting hint for the user, when there is a useful one
    pub fn help_message(&self) -> Option<String> {
        match self {
            PipelineError::InvalidDomain(_) => {
                Some("Pass a bare domain name such as example.com".to_string())
            }
            PipelineError::Fingerprint(FingerprintError::Authentication { .. }) => Some(
                "Check BUILTWITH_API_KEY: set it in the environment, ./.env or ~/.config/stackprobe/.env"
                    .to_string(),
            ),
            PipelineError::Fingerprint(FingerprintError::Network { .. })
            | PipelineError::Fingerprint(FingerprintError::Timeout { .. }) => Some(
                "Check your network connection, or raise STACKPROBE_REQUEST_TIMEOUT".to_string(),
            ),
            PipelineError::Fingerprint(FingerprintError::DomainNotFound { .. }) => {
                Some("Verify the domain is spelled correctly and publicly reachable".to_string())
            }
            PipelineError::Fingerprint(_) => None,
            PipelineError::Insight(InsightError::ModelUnavailable { endpoint, .. }) => Some(format!(
                "Start the model service with `ollama serve` (expected at {}), or set OLLAMA_HOST",
                endpoint
            )),
            PipelineError::Insight(InsightError::ModelNotFound { model }) => {
                Some(format!("Install the model with `ollama pull {}`", model))
            }
            PipelineError::Insight(InsightError::Timeout { .. }) => Some(
                "Raise STACKPROBE_LLM_TIMEOUT or pass --timeout, or try a smaller model".to_string(),
            ),
            PipelineError::Insight(_) => None,
            PipelineError::Report(ReportError::Io { path, .. }) => Some(format!(
                "Check that {} is writable",
                path.display()
            )),
            PipelineError::Report(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(PipelineError::InvalidDomain(String::new()).exit_code(), 2);
        let err: PipelineError = InsightError::Timeout { seconds: 5 }.into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_help_messages() {
        let err: PipelineError = FingerprintError::Authentication {
            message: "missing".to_string(),
        }
        .into();
        assert!(err.help_message().unwrap().contains("BUILTWITH_API_KEY"));

        let err: PipelineError = InsightError::ModelNotFound {
            model: "llama3".to_string(),
        }
        .into();
        assert!(err.help_message().unwrap().contains("ollama pull llama3"));

        let err: PipelineError = InsightError::ModelUnavailable {
            endpoint: "http://localhost:11434".to_string(),
            message: "refused".to_string(),
        }
        .into();
        assert!(err.help_message().unwrap().contains("ollama serve"));

        let err: PipelineError = FingerprintError::parse("bad").into();
        assert!(err.help_message().is_none());
    }
}

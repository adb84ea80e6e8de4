use thiserror::Error;

/// Errors from the fingerprint stage
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Credential missing or rejected by the service
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Transport-level failure
    #[error("Network error: {message}")]
    Network { message: String },

    /// No response within the configured timeout
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The service does not know the domain
    #[error("Domain '{domain}' not found or invalid")]
    DomainNotFound { domain: String },

    /// Any other non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body is not a well-formed fingerprint document
    #[error("Failed to parse fingerprint response: {message}")]
    Parse { message: String },
}

impl FingerprintError {
    pub fn parse(message: impl Into<String>) -> Self {
        FingerprintError::Parse {
            message: message.into(),
        }
    }
}

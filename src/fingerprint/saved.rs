//! Fingerprints from a previously saved response document

use super::client::FingerprintSource;
use super::error::FingerprintError;
use super::parse::parse_document;
use super::types::FingerprintResult;
use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Serves a fixed BuiltWith document instead of calling the API. Used by
/// `export --json` and to drive the pipeline from canned data.
#[derive(Debug, Clone)]
pub struct SavedResponse {
    document: Value,
}

impl SavedResponse {
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    pub fn from_json_str(body: &str) -> Result<Self, FingerprintError> {
        let document = serde_json::from_str(body)
            .map_err(|e| FingerprintError::parse(format!("invalid JSON: {}", e)))?;
        Ok(Self::new(document))
    }

    /// Reads a document saved with `lookup --save`.
    pub fn from_file(path: &Path) -> Result<Self, FingerprintError> {
        debug!("Loading saved fingerprint from {}", path.display());
        let body = fs::read_to_string(path).map_err(|e| {
            FingerprintError::parse(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&body).map_err(|e| match e {
            FingerprintError::Parse { message } => {
                FingerprintError::parse(format!("{} in {}", message, path.display()))
            }
            other => other,
        })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }
}

#[async_trait]
impl FingerprintSource for SavedResponse {
    async fn lookup(&self, domain: &str) -> Result<FingerprintResult, FingerprintError> {
        parse_document(domain, self.document.clone())
    }

    fn name(&self) -> &str {
        "saved-response"
    }
}

//! BuiltWith HTTP client
//!
//! Issues a single `GET /v22/api.json?KEY=..&LOOKUP=..` per lookup. There is
//! no retry, pagination or rate-limit handling; failures are classified and
//! returned to the caller.
//!
//! # Example
//!
//! ```no_run
//! use stackprobe::fingerprint::{BuiltWithClient, FingerprintSource};
//! use stackprobe::StackprobeConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StackprobeConfig::load()?;
//! let client = BuiltWithClient::from_config(&config)?;
//!
//! let result = client.lookup("example.com").await?;
//! for (category, item) in result.items() {
//!     println!("{}: {}", category, item.name);
//! }
//! # Ok(())
//! # }
//! ```

use super::error::FingerprintError;
use super::parse::parse_body;
use super::types::FingerprintResult;
use crate::config::StackprobeConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const API_PATH: &str = "/v22/api.json";

/// A source of technology fingerprints for a domain
#[async_trait]
pub trait FingerprintSource: Send + Sync {
    /// Looks up the technologies in use on `domain`.
    async fn lookup(&self, domain: &str) -> Result<FingerprintResult, FingerprintError>;

    /// Human-readable name of this source
    fn name(&self) -> &str;
}

/// Client for the BuiltWith domain API
pub struct BuiltWithClient {
    endpoint: String,
    api_key: Option<String>,
    http_client: Client,
    timeout: Duration,
}

impl BuiltWithClient {
    /// Creates a client. A missing key is accepted here and reported as an
    /// authentication failure on the first lookup, before any request is sent.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FingerprintError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stackprobe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FingerprintError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            http_client,
            timeout,
        })
    }

    pub fn from_config(config: &StackprobeConfig) -> Result<Self, FingerprintError> {
        Self::new(
            config.api_endpoint.clone(),
            config.api_key.clone(),
            config.request_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetches the raw response body for `domain`.
    pub async fn fetch(&self, domain: &str) -> Result<String, FingerprintError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| FingerprintError::Authentication {
                message: "BUILTWITH_API_KEY is not set. Add it to your environment or .env file"
                    .to_string(),
            })?;

        let url = format!("{}{}", self.endpoint, API_PATH);
        debug!("Querying BuiltWith at {} for {}", url, domain);

        let start = Instant::now();

        let response = self
            .http_client
            .get(&url)
            .query(&[("KEY", api_key), ("LOOKUP", domain)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!("BuiltWith request timed out after {:?}", self.timeout);
                    FingerprintError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    error!("Cannot connect to BuiltWith at {}", self.endpoint);
                    FingerprintError::Network {
                        message: format!("Connection failed: {}", without_query(&e)),
                    }
                } else {
                    error!("BuiltWith request error: {}", without_query(&e));
                    FingerprintError::Network {
                        message: format!("Request failed: {}", without_query(&e)),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("BuiltWith returned error status {}", status);
            return Err(classify_status(status, domain, &body));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FingerprintError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
            } else {
                FingerprintError::Network {
                    message: format!("Failed to read response body: {}", without_query(&e)),
                }
            }
        })?;

        info!(
            "BuiltWith lookup completed in {:.2}s ({} bytes)",
            start.elapsed().as_secs_f64(),
            body.len()
        );

        Ok(body)
    }
}

#[async_trait]
impl FingerprintSource for BuiltWithClient {
    async fn lookup(&self, domain: &str) -> Result<FingerprintResult, FingerprintError> {
        let body = self.fetch(domain).await?;
        parse_body(domain, &body)
    }

    fn name(&self) -> &str {
        "builtwith"
    }
}

impl fmt::Debug for BuiltWithClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltWithClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn classify_status(status: StatusCode, domain: &str, body: &str) -> FingerprintError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FingerprintError::Authentication {
            message: "the API key was rejected. Please check BUILTWITH_API_KEY".to_string(),
        },
        StatusCode::NOT_FOUND => FingerprintError::DomainNotFound {
            domain: domain.to_string(),
        },
        _ => FingerprintError::Api {
            status: status.as_u16(),
            message: body.chars().take(200).collect::<String>().trim().to_string(),
        },
    }
}

// reqwest includes the request URL in its errors, and ours carries the key.
fn without_query(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    if let Some(url) = err.url() {
        if let Some(query) = url.query() {
            message = message.replace(query, "<redacted>");
        }
    }
    message
}

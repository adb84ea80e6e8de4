//! Ollama HTTP client for local LLM inference
//!
//! Sends one chat request per insight to a local Ollama server. Responses
//! can be taken whole or streamed chunk by chunk to a sink (the CLI prints
//! them as they arrive).
//!
//! # Example
//!
//! ```no_run
//! use stackprobe::insight::{InsightBackend, OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::with_timeout(
//!     "http://localhost:11434",
//!     "llama3",
//!     Duration::from_secs(120),
//! )?;
//!
//! if client.health_check().await?.reachable {
//!     let text = client.generate("Summarize: WordPress, Nginx").await?;
//!     println!("{}", text);
//! }
//! # Ok(())
//! # }
//! ```

use super::backend::InsightBackend;
use super::error::InsightError;
use crate::config::StackprobeConfig;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default request timeout for Ollama API calls
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Receives streamed text chunks as they arrive
pub type ChunkSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Result of probing the Ollama server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaHealth {
    pub endpoint: String,
    pub reachable: bool,
    pub model: String,
    pub model_installed: bool,
    pub installed_models: Vec<String>,
}

/// Ollama client for local LLM inference
///
/// # Configuration
///
/// - **endpoint**: Ollama API endpoint (e.g., "http://localhost:11434")
/// - **model**: Model name (e.g., "llama3", "tinyllama")
/// - **timeout**: Request timeout duration
pub struct OllamaClient {
    endpoint: String,
    model: String,
    http_client: Client,
    timeout: Duration,
    stream_sink: Option<ChunkSink>,
}

impl OllamaClient {
    /// Creates a new Ollama client with default timeout
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, InsightError> {
        Self::with_timeout(endpoint, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new Ollama client with custom timeout
    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InsightError> {
        let http_client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| InsightError::Configuration {
                    message: format!("Failed to build HTTP client: {}", e),
                })?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http_client,
            timeout,
            stream_sink: None,
        })
    }

    pub fn from_config(config: &StackprobeConfig) -> Result<Self, InsightError> {
        Self::with_timeout(
            config.ollama_endpoint.clone(),
            config.model.clone(),
            config.llm_timeout(),
        )
    }

    /// Streams the response, passing each chunk to `sink` as it arrives.
    pub fn with_streaming(mut self, sink: ChunkSink) -> Self {
        self.stream_sink = Some(sink);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_streaming(&self) -> bool {
        self.stream_sink.is_some()
    }

    /// Checks if the Ollama server is reachable and has the configured model
    ///
    /// Makes a lightweight request to `/api/tags`. An unreachable server or a
    /// timeout is reported as `reachable: false` rather than an error.
    pub async fn health_check(&self) -> Result<OllamaHealth, InsightError> {
        let url = format!("{}/api/tags", self.endpoint);

        debug!("Checking Ollama health at {}", url);

        let mut health = OllamaHealth {
            endpoint: self.endpoint.clone(),
            reachable: false,
            model: self.model.clone(),
            model_installed: false,
            installed_models: Vec::new(),
        };

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Ollama health check timed out");
                return Ok(health);
            }
            Err(e) if e.is_connect() => {
                warn!("Cannot connect to Ollama at {}", self.endpoint);
                return Ok(health);
            }
            Err(e) => {
                error!("Ollama health check error: {}", e);
                return Err(InsightError::ModelUnavailable {
                    endpoint: self.endpoint.clone(),
                    message: format!("Health check failed: {}", e),
                });
            }
        };

        if !response.status().is_success() {
            warn!(
                "Ollama health check failed with status: {}",
                response.status()
            );
            return Ok(health);
        }

        health.reachable = true;
        let tags: TagsResponse = response.json().await.map_err(|e| {
            InsightError::InvalidResponse {
                message: format!("Failed to parse /api/tags response: {}", e),
            }
        })?;

        health.installed_models = tags.models.into_iter().map(|m| m.name).collect();
        health.model_installed = health
            .installed_models
            .iter()
            .any(|name| model_matches(name, &self.model));

        info!(
            "Ollama health check successful ({} models, '{}' installed: {})",
            health.installed_models.len(),
            self.model,
            health.model_installed
        );

        Ok(health)
    }

    async fn chat(&self, prompt: &str) -> Result<String, InsightError> {
        let url = format!("{}/api/chat", self.endpoint);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: self.is_streaming(),
        };

        debug!(
            "Sending request to Ollama: model={}, prompt_length={}, stream={}",
            self.model,
            prompt.len(),
            request.stream
        );

        let start = Instant::now();

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let response = self.check_status(response).await?;

        let text = match &self.stream_sink {
            Some(sink) => self.read_stream(response, sink).await?,
            None => {
                let chat: ChatResponse = response.json().await.map_err(|e| {
                    if e.is_timeout() {
                        self.timeout_error()
                    } else {
                        error!("Failed to parse Ollama response: {}", e);
                        InsightError::InvalidResponse {
                            message: format!("JSON parse error: {}", e),
                        }
                    }
                })?;

                if let Some(message) = chat.error {
                    return Err(InsightError::Api {
                        message,
                        status_code: None,
                    });
                }
                if !chat.done {
                    warn!("Ollama response indicates incomplete generation");
                }
                debug!(
                    "Ollama stats: model={}, prompt_tokens={}, eval_tokens={}, total_duration={:?}",
                    chat.model.as_deref().unwrap_or(&self.model),
                    chat.prompt_eval_count.unwrap_or(0),
                    chat.eval_count.unwrap_or(0),
                    chat.total_duration
                );
                chat.message.map(|m| m.content).unwrap_or_default()
            }
        };

        info!(
            "Ollama generation completed in {:.2}s (model={}, {} chars)",
            start.elapsed().as_secs_f64(),
            self.model,
            text.len()
        );

        Ok(text)
    }

    /// Reads newline-delimited JSON chunks until the final `done` message.
    async fn read_stream(
        &self,
        mut response: Response,
        sink: &ChunkSink,
    ) -> Result<String, InsightError> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut text = String::new();

        loop {
            let chunk = response.chunk().await.map_err(|e| {
                if e.is_timeout() {
                    self.timeout_error()
                } else {
                    InsightError::ModelUnavailable {
                        endpoint: self.endpoint.clone(),
                        message: format!("Stream interrupted: {}", e),
                    }
                }
            })?;

            let Some(bytes) = chunk else { break };
            buffer.extend_from_slice(&bytes);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if apply_stream_line(&line, &mut text, sink)? {
                    return Ok(text);
                }
            }
        }

        if !buffer.is_empty() {
            apply_stream_line(&buffer, &mut text, sink)?;
        }

        Ok(text)
    }

    async fn check_status(&self, response: Response) -> Result<Response, InsightError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Ollama API returned error status {}: {}", status, body);

        if status == StatusCode::NOT_FOUND && body.contains("model") {
            return Err(InsightError::ModelNotFound {
                model: self.model.clone(),
            });
        }

        Err(InsightError::Api {
            message: format!("HTTP {}: {}", status, body.trim()),
            status_code: Some(status.as_u16()),
        })
    }

    fn classify_transport_error(&self, e: reqwest::Error) -> InsightError {
        if e.is_timeout() {
            error!("Ollama request timed out after {:?}", self.timeout);
            self.timeout_error()
        } else if e.is_connect() {
            error!("Cannot connect to Ollama at {}", self.endpoint);
            InsightError::ModelUnavailable {
                endpoint: self.endpoint.clone(),
                message: format!("Connection failed: {}", e),
            }
        } else {
            error!("Ollama request error: {}", e);
            InsightError::ModelUnavailable {
                endpoint: self.endpoint.clone(),
                message: format!("Request failed: {}", e),
            }
        }
    }

    fn timeout_error(&self) -> InsightError {
        InsightError::Timeout {
            seconds: self.timeout.as_secs(),
        }
    }
}

#[async_trait]
impl InsightBackend for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        self.chat(prompt).await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn model_info(&self) -> Option<String> {
        Some(format!("{} @ {}", self.model, self.endpoint))
    }
}

impl fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

/// Handles one streamed line. Returns `true` once the final chunk is seen.
fn apply_stream_line(
    line: &[u8],
    text: &mut String,
    sink: &ChunkSink,
) -> Result<bool, InsightError> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(false);
    }

    let chunk: ChatResponse =
        serde_json::from_str(line).map_err(|e| InsightError::InvalidResponse {
            message: format!("Malformed stream chunk: {}", e),
        })?;

    if let Some(message) = chunk.error {
        return Err(InsightError::Api {
            message,
            status_code: None,
        });
    }

    if let Some(message) = chunk.message {
        if !message.content.is_empty() {
            sink(&message.content);
            text.push_str(&message.content);
        }
    }

    Ok(chunk.done)
}

/// `llama3` matches an installed `llama3:latest`; a tagged name must match
/// exactly.
fn model_matches(installed: &str, wanted: &str) -> bool {
    if installed == wanted {
        return true;
    }
    !wanted.contains(':') && installed.split(':').next() == Some(wanted)
}

/// Request structure for the Ollama chat API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response (or stream chunk) from the Ollama chat API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,

    #[serde(default)]
    message: Option<ChatMessage>,

    #[serde(default)]
    done: bool,

    /// Present when the server reports a failure in-band
    #[serde(default)]
    error: Option<String>,

    /// Total duration in nanoseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt_eval_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    eval_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct TagEntry {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3").unwrap();

        assert_eq!(client.endpoint, "http://localhost:11434");
        assert_eq!(client.model, "llama3");
        assert_eq!(client.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(!client.is_streaming());
    }

    #[test]
    fn test_backend_trait_methods() {
        let client = OllamaClient::new("http://localhost:11434", "llama3").unwrap();

        assert_eq!(client.name(), "ollama");
        assert_eq!(client.model(), "llama3");
        assert_eq!(
            client.model_info().unwrap(),
            "llama3 @ http://localhost:11434"
        );
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "llama3".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "test prompt".to_string(),
            }],
            stream: false,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"llama3\""));
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"test prompt\""));
        assert!(json.contains("\"stream\":false"));
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{
            "model": "llama3",
            "created_at": "2024-01-01T00:00:00Z",
            "message": {"role": "assistant", "content": "test response"},
            "done": true,
            "total_duration": 1000000,
            "prompt_eval_count": 10,
            "eval_count": 20
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.model.as_deref(), Some("llama3"));
        assert_eq!(response.message.unwrap().content, "test response");
        assert!(response.done);
        assert_eq!(response.prompt_eval_count, Some(10));
    }

    #[test]
    fn test_stream_lines_accumulate_until_done() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen_clone = seen.clone();
        let sink: ChunkSink = Arc::new(move |chunk: &str| {
            seen_clone.lock().unwrap().push(chunk.to_string());
        });

        let mut text = String::new();
        let first = br#"{"message":{"role":"assistant","content":"Word"},"done":false}"#;
        let last = br#"{"message":{"role":"assistant","content":"Press"},"done":true}"#;

        assert!(!apply_stream_line(first, &mut text, &sink).unwrap());
        assert!(!apply_stream_line(b"   ", &mut text, &sink).unwrap());
        assert!(apply_stream_line(last, &mut text, &sink).unwrap());

        assert_eq!(text, "WordPress");
        assert_eq!(*seen.lock().unwrap(), vec!["Word", "Press"]);
    }

    #[test]
    fn test_stream_error_line() {
        let sink: ChunkSink = Arc::new(|_: &str| {});
        let mut text = String::new();
        let err = apply_stream_line(br#"{"error":"out of memory"}"#, &mut text, &sink).unwrap_err();
        assert!(err.to_string().contains("out of memory"));
    }

    #[test]
    fn test_model_matches() {
        assert!(model_matches("llama3:latest", "llama3"));
        assert!(model_matches("llama3:8b", "llama3:8b"));
        assert!(!model_matches("llama3:8b", "llama3:70b"));
        assert!(!model_matches("llama3.2:latest", "llama3"));
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let client = OllamaClient::with_timeout(
            "http://localhost:59999",
            "llama3",
            Duration::from_millis(100),
        )
        .unwrap();

        let health = client.health_check().await.unwrap();
        assert!(!health.reachable);
        assert!(!health.model_installed);
    }
}

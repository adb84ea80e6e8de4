//! Configuration management for stackprobe
//!
//! All settings live in a single [`StackprobeConfig`] that is built once at
//! startup and handed to each pipeline component. Values come from, in order
//! of increasing precedence:
//!
//! 1. Built-in defaults
//! 2. `~/.config/stackprobe/.env`
//! 3. `./.env` in the working directory
//! 4. The process environment
//! 5. Command-line flags (applied by the CLI layer)
//!
//! # Environment Variables
//!
//! - `BUILTWITH_API_KEY`: BuiltWith API credential - no default
//! - `BUILTWITH_API_ENDPOINT`: BuiltWith API base URL - default: "https://api.builtwith.com"
//! - `OLLAMA_HOST`: Ollama endpoint - default: "http://localhost:11434"
//! - `STACKPROBE_MODEL`: Ollama model name - default: "llama3"
//! - `STACKPROBE_REQUEST_TIMEOUT`: BuiltWith timeout in seconds - default: "30"
//! - `STACKPROBE_LLM_TIMEOUT`: generation timeout in seconds - default: "300"
//! - `STACKPROBE_LOG_LEVEL`: logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use stackprobe::StackprobeConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StackprobeConfig::load()?;
//! config.validate()?;
//! println!("{}", config);
//! # Ok(())
//! # }
//! ```

use reqwest::Url;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BUILTWITH_ENDPOINT: &str = "https://api.builtwith.com";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 300;
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Runtime configuration shared by the fingerprint client, the insight
/// generator and the report writer.
#[derive(Clone)]
pub struct StackprobeConfig {
    /// BuiltWith API credential; absence is reported when a lookup is attempted
    pub api_key: Option<String>,

    /// BuiltWith API base URL
    pub api_endpoint: String,

    /// Ollama API base URL
    pub ollama_endpoint: String,

    /// Model used for insight generation
    pub model: String,

    /// Timeout for the fingerprint request, in seconds
    pub request_timeout_secs: u64,

    /// Timeout for insight generation, in seconds
    pub llm_timeout_secs: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for StackprobeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: DEFAULT_BUILTWITH_ENDPOINT.to_string(),
            ollama_endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl StackprobeConfig {
    /// Loads `.env` files and then reads the environment.
    ///
    /// `dotenvy` never overrides variables that are already set, so the
    /// working-directory file is loaded before the per-user one to give it
    /// precedence.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(ConfigError::ParseError {
                    field: ".env".to_string(),
                    error: e.to_string(),
                })
            }
        }

        if let Some(path) = user_env_file() {
            if path.is_file() {
                dotenvy::from_path(&path).map_err(|e| ConfigError::ParseError {
                    field: path.display().to_string(),
                    error: e.to_string(),
                })?;
                debug!("Loaded environment from {}", path.display());
            }
        }

        Self::from_env()
    }

    /// Builds the configuration from process environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_key = env::var("BUILTWITH_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            api_key,
            api_endpoint: env_string("BUILTWITH_API_ENDPOINT").unwrap_or(defaults.api_endpoint),
            ollama_endpoint: env_string("OLLAMA_HOST").unwrap_or(defaults.ollama_endpoint),
            model: env_string("STACKPROBE_MODEL").unwrap_or(defaults.model),
            request_timeout_secs: env_secs("STACKPROBE_REQUEST_TIMEOUT")?
                .unwrap_or(defaults.request_timeout_secs),
            llm_timeout_secs: env_secs("STACKPROBE_LLM_TIMEOUT")?
                .unwrap_or(defaults.llm_timeout_secs),
            log_level: env_string("STACKPROBE_LOG_LEVEL")
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_level),
        })
    }

    /// Validates the configuration
    ///
    /// Checks that timeouts are within 1 second and 1 hour, that the log
    /// level is recognised and that both endpoints are http(s) URLs. The API
    /// key is not checked here; a missing key is an authentication failure of
    /// the fingerprint stage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, secs) in [
            ("Request timeout", self.request_timeout_secs),
            ("LLM timeout", self.llm_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be at least 1 second",
                    name
                )));
            }
            if secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} cannot exceed {} seconds",
                    name, MAX_TIMEOUT_SECS
                )));
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        validate_endpoint("BUILTWITH_API_ENDPOINT", &self.api_endpoint)?;
        validate_endpoint("OLLAMA_HOST", &self.ollama_endpoint)?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Model name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

impl fmt::Display for StackprobeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stackprobe Configuration:")?;
        writeln!(
            f,
            "  API Key: {}",
            self.api_key
                .as_deref()
                .map(mask_api_key)
                .unwrap_or_else(|| "(not set)".to_string())
        )?;
        writeln!(f, "  API Endpoint: {}", self.api_endpoint)?;
        writeln!(f, "  Ollama Endpoint: {}", self.ollama_endpoint)?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  LLM Timeout: {}s", self.llm_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

// Keeps the credential out of `{:?}` output.
impl fmt::Debug for StackprobeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackprobeConfig")
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("api_endpoint", &self.api_endpoint)
            .field("ollama_endpoint", &self.ollama_endpoint)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Shows the first four characters of a credential and masks the rest.
pub fn mask_api_key(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    let hidden = value.chars().count().saturating_sub(4);
    format!("{}{}", visible, "*".repeat(hidden))
}

/// Location of the per-user `.env` file.
pub fn user_env_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stackprobe").join(".env"))
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_secs(key: &str) -> Result<Option<u64>, ConfigError> {
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError {
                field: key.to_string(),
                error: format!("'{}': {}", raw, e),
            }),
    }
}

fn validate_endpoint(name: &str, endpoint: &str) -> Result<(), ConfigError> {
    let url = Url::parse(endpoint).map_err(|e| {
        ConfigError::ValidationFailed(format!("{} is not a valid URL ({}): {}", name, endpoint, e))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::ValidationFailed(format!(
            "{} must use http or https, got '{}'",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_environment_is_empty() {
        let _guards = vec![
            EnvGuard::unset("BUILTWITH_API_KEY"),
            EnvGuard::unset("BUILTWITH_API_ENDPOINT"),
            EnvGuard::unset("OLLAMA_HOST"),
            EnvGuard::unset("STACKPROBE_MODEL"),
            EnvGuard::unset("STACKPROBE_REQUEST_TIMEOUT"),
            EnvGuard::unset("STACKPROBE_LLM_TIMEOUT"),
            EnvGuard::unset("STACKPROBE_LOG_LEVEL"),
        ];

        let config = StackprobeConfig::from_env().unwrap();

        assert!(config.api_key.is_none());
        assert_eq!(config.api_endpoint, DEFAULT_BUILTWITH_ENDPOINT);
        assert_eq!(config.ollama_endpoint, DEFAULT_OLLAMA_ENDPOINT);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.llm_timeout_secs, DEFAULT_LLM_TIMEOUT_SECS);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("BUILTWITH_API_KEY", "  abcd1234  "),
            EnvGuard::set("OLLAMA_HOST", "http://gpu-box:11434"),
            EnvGuard::set("STACKPROBE_MODEL", "tinyllama"),
            EnvGuard::set("STACKPROBE_REQUEST_TIMEOUT", "45"),
            EnvGuard::set("STACKPROBE_LLM_TIMEOUT", "90"),
            EnvGuard::set("STACKPROBE_LOG_LEVEL", "DEBUG"),
        ];

        let config = StackprobeConfig::from_env().unwrap();

        assert_eq!(config.api_key.as_deref(), Some("abcd1234"));
        assert_eq!(config.ollama_endpoint, "http://gpu-box:11434");
        assert_eq!(config.model, "tinyllama");
        assert_eq!(config.request_timeout_secs, 45);
        assert_eq!(config.llm_timeout_secs, 90);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_blank_api_key_is_treated_as_missing() {
        let _guard = EnvGuard::set("BUILTWITH_API_KEY", "   ");
        let config = StackprobeConfig::from_env().unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_invalid_timeout_is_a_parse_error() {
        let _guard = EnvGuard::set("STACKPROBE_REQUEST_TIMEOUT", "soon");
        let err = StackprobeConfig::from_env().unwrap_err();
        match err {
            ConfigError::ParseError { field, .. } => {
                assert_eq!(field, "STACKPROBE_REQUEST_TIMEOUT")
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = StackprobeConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_excessive_llm_timeout() {
        let config = StackprobeConfig {
            llm_timeout_secs: MAX_TIMEOUT_SECS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_invalid_log_level() {
        let config = StackprobeConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_http_endpoint() {
        let config = StackprobeConfig {
            ollama_endpoint: "ftp://localhost:11434".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("OLLAMA_HOST"));

        let config = StackprobeConfig {
            api_endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("abcdefgh"), "abcd****");
        assert_eq!(mask_api_key("abc"), "abc");
    }

    #[test]
    fn test_display_and_debug_never_show_full_key() {
        let config = StackprobeConfig {
            api_key: Some("secret-key-value".to_string()),
            ..Default::default()
        };
        let display = format!("{}", config);
        let debug = format!("{:?}", config);

        assert!(display.contains("Stackprobe Configuration:"));
        assert!(!display.contains("secret-key-value"));
        assert!(!debug.contains("secret-key-value"));
        assert!(display.contains("API Key: secr************"));
    }
}

//! Subcommand handlers
//!
//! Each handler returns the process exit code: 0 on success, 1 when a stage
//! fails, 2 for invalid arguments or configuration.

use super::commands::{ExportArgs, HealthArgs, JsonStyle, LookupArgs, OutputFormatArg, RunArgs};
use super::output::{HealthStatus, OutputFormat, OutputFormatter};
use crate::config::{mask_api_key, StackprobeConfig};
use crate::fingerprint::{BuiltWithClient, FingerprintError, FingerprintSource, SavedResponse};
use crate::insight::{ChunkSink, Insight, OllamaClient};
use crate::pipeline::{Pipeline, PipelineError, RunRequest};
use crate::progress::{ConsoleHandler, LoggingHandler, ProgressHandler, SpinnerHandler};
use crate::report::default_output_path;

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

pub async fn handle_run(args: &RunArgs, config: &StackprobeConfig, quiet: bool) -> i32 {
    info!("Starting analysis for {}", args.domain.trim());

    let config = StackprobeConfig {
        model: args.model.clone().unwrap_or_else(|| config.model.clone()),
        llm_timeout_secs: args.timeout.unwrap_or(config.llm_timeout_secs),
        ..config.clone()
    };
    if args.model.is_some() {
        debug!("Model overridden to: {}", config.model);
    }
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        eprintln!("Configuration error: {}", e);
        return EXIT_USAGE;
    }

    let source = match BuiltWithClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => return report_failure(&PipelineError::from(e)),
    };
    let mut ollama = match OllamaClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => return report_failure(&PipelineError::from(e)),
    };

    let human = args.format == OutputFormatArg::Human;
    let streaming = args.stream && human;
    if args.stream && !human {
        warn!("--stream is only supported with human output; ignoring");
    }
    if streaming {
        ollama = ollama.with_streaming(stdout_sink());
    }

    let base: Arc<dyn ProgressHandler> =
        if human && !streaming && !quiet && atty::is(atty::Stream::Stderr) {
            Arc::new(SpinnerHandler::new())
        } else {
            Arc::new(LoggingHandler)
        };
    let progress = ConsoleHandler::new(base, stdout_sink())
        .with_document(args.show_json)
        .with_insight_banner(streaming);

    let mut request = RunRequest::new(args.domain.clone());
    if args.excel {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&args.domain));
        debug!("Report path: {}", path.display());
        request = request.with_export(path);
    } else if args.output.is_some() {
        warn!("--output is only used together with --excel; ignoring");
    }

    let pipeline = Pipeline::new(Arc::new(source))
        .with_insight(Arc::new(ollama))
        .with_progress(Arc::new(progress));

    let outcome = match pipeline.run(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if streaming {
                println!();
            }
            return report_failure(&e);
        }
    };

    if streaming {
        println!();
    }

    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format_run(&outcome, !streaming) {
        Ok(output) => {
            print!("{}", output);
            EXIT_SUCCESS
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            EXIT_FAILURE
        }
    }
}

pub async fn handle_lookup(args: &LookupArgs, config: &StackprobeConfig) -> i32 {
    let domain = args.domain.trim();
    if domain.is_empty() {
        return report_failure(&PipelineError::InvalidDomain(
            "domain must not be empty".to_string(),
        ));
    }
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        return EXIT_USAGE;
    }

    let client = match BuiltWithClient::from_config(config) {
        Ok(client) => client,
        Err(e) => return report_failure(&PipelineError::from(e)),
    };

    let body = match client.fetch(domain).await {
        Ok(body) => body,
        Err(e) => return report_failure(&PipelineError::from(e)),
    };

    let document: Value = match serde_json::from_str(&body) {
        Ok(document) => document,
        Err(e) => {
            return report_failure(&PipelineError::from(FingerprintError::parse(format!(
                "invalid JSON: {}",
                e
            ))))
        }
    };

    if let Some(errors) = document.get("Errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            warn!("BuiltWith returned {} error(s) for {}", errors.len(), domain);
        }
    }

    let printed = match args.output {
        JsonStyle::Pretty => serde_json::to_string_pretty(&document),
        JsonStyle::Json => serde_json::to_string(&document),
    };
    match printed {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            return EXIT_FAILURE;
        }
    }

    if let Some(path) = &args.save {
        if let Err(e) = save_document(path, &document) {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            return EXIT_FAILURE;
        }
        info!("Saved response to {}", path.display());
    }

    EXIT_SUCCESS
}

pub async fn handle_export(args: &ExportArgs, config: &StackprobeConfig) -> i32 {
    let (source, domain): (Arc<dyn FingerprintSource>, String) = match &args.json {
        Some(path) => {
            let saved = match SavedResponse::from_file(path) {
                Ok(saved) => saved,
                Err(e) => return report_failure(&PipelineError::from(e)),
            };
            let domain = args
                .domain
                .clone()
                .or_else(|| saved_lookup_domain(saved.document()))
                .or_else(|| {
                    path.file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                })
                .unwrap_or_else(|| "saved".to_string());
            (Arc::new(saved), domain)
        }
        None => {
            if let Err(e) = config.validate() {
                eprintln!("Configuration error: {}", e);
                return EXIT_USAGE;
            }
            let client = match BuiltWithClient::from_config(config) {
                Ok(client) => client,
                Err(e) => return report_failure(&PipelineError::from(e)),
            };
            (Arc::new(client), args.domain.clone().unwrap_or_default())
        }
    };

    let mut request = RunRequest::new(domain.clone()).with_export(
        args.output
            .clone()
            .unwrap_or_else(|| default_output_path(&domain)),
    );

    if let Some(llm) = &args.llm {
        match read_insight_arg(llm) {
            Ok(insight) => request = request.with_insight(insight),
            Err(e) => {
                error!("{:#}", e);
                eprintln!("Error: {:#}", e);
                return EXIT_FAILURE;
            }
        }
    }

    let pipeline = Pipeline::new(source).with_progress(Arc::new(LoggingHandler));
    match pipeline.run(request).await {
        Ok(outcome) => {
            match OutputFormatter::new(OutputFormat::Human).format_run(&outcome, false) {
                Ok(output) => print!("{}", output),
                Err(e) => warn!("Failed to format summary: {:#}", e),
            }
            EXIT_SUCCESS
        }
        Err(e) => report_failure(&e),
    }
}

pub async fn handle_health(args: &HealthArgs, config: &StackprobeConfig) -> i32 {
    info!("Checking service health");

    let mut results = BTreeMap::new();

    let builtwith = match &config.api_key {
        Some(key) if !key.trim().is_empty() => {
            HealthStatus::available("API key is configured").with_details(format!(
                "Key: {} (endpoint {})",
                mask_api_key(key),
                config.api_endpoint
            ))
        }
        _ => HealthStatus::unavailable("BUILTWITH_API_KEY not configured")
            .with_details("Set BUILTWITH_API_KEY in the environment, ./.env or ~/.config/stackprobe/.env"),
    };
    results.insert("builtwith".to_string(), builtwith);

    let ollama = match OllamaClient::from_config(config) {
        Ok(client) => match client.health_check().await {
            Ok(health) if health.reachable && health.model_installed => {
                HealthStatus::available(format!("Connected to {}", health.endpoint))
                    .with_details(format!("Model: {}", health.model))
            }
            Ok(health) if health.reachable => {
                HealthStatus::unavailable(format!("Model '{}' is not installed", health.model))
                    .with_details(format!("Pull it with: ollama pull {}", health.model))
            }
            Ok(health) => HealthStatus::unavailable(format!("Cannot connect to {}", health.endpoint))
                .with_details("Ensure Ollama is running: ollama serve"),
            Err(e) => HealthStatus::unavailable(e.to_string()),
        },
        Err(e) => HealthStatus::unavailable(e.to_string()),
    };
    results.insert("ollama".to_string(), ollama);

    let all_available = results.values().all(|status| status.available);

    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format_health(&results) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            error!("Failed to format health status: {:#}", e);
            return EXIT_FAILURE;
        }
    }

    if all_available {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

fn report_failure(e: &PipelineError) -> i32 {
    error!("{}", e);
    eprintln!("Error: {}", e);
    if let Some(help) = e.help_message() {
        eprintln!("Tip: {}", help);
    }
    e.exit_code()
}

fn stdout_sink() -> ChunkSink {
    Arc::new(|chunk: &str| {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(chunk.as_bytes());
        let _ = stdout.flush();
    })
}

/// `--llm` names a file when one exists at that path; otherwise it is the
/// analysis text itself.
fn read_insight_arg(value: &str) -> Result<Insight> {
    let path = Path::new(value);
    if path.is_file() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read analysis from {}", path.display()))?;
        Ok(Insight::provided(text))
    } else {
        Ok(Insight::provided(value))
    }
}

/// The domain recorded in a saved BuiltWith document, if any
fn saved_lookup_domain(document: &Value) -> Option<String> {
    let results = document.get("Results")?;
    let first = match results {
        Value::Array(entries) => entries.first()?,
        other => other,
    };
    first
        .get("Lookup")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn save_document(path: &Path, document: &Value) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(document).context("Failed to serialize response")?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_insight_arg_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "Line one\nLine two\n").unwrap();

        let insight = read_insight_arg(path.to_str().unwrap()).unwrap();
        assert_eq!(insight.text, "Line one\nLine two\n");
        assert_eq!(insight.model, "provided");
    }

    #[test]
    fn test_read_insight_arg_literal_text() {
        let insight = read_insight_arg("Looks like a WordPress site").unwrap();
        assert_eq!(insight.text, "Looks like a WordPress site");
    }

    #[test]
    fn test_saved_lookup_domain() {
        let doc = json!({"Results": [{"Lookup": "example.com", "Result": {}}]});
        assert_eq!(saved_lookup_domain(&doc).as_deref(), Some("example.com"));
        assert_eq!(saved_lookup_domain(&json!({"Nginx": []})), None);
    }

    #[test]
    fn test_save_document_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved/example.json");

        save_document(&path, &json!({"Nginx": [{"status": "live"}]})).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["Nginx"][0]["status"], "live");
    }

    #[tokio::test]
    async fn test_export_from_saved_json() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("example.json");
        fs::write(
            &json_path,
            r#"{"WordPress": [{"status":"live"}], "Nginx":[{"status":"live"}]}"#,
        )
        .unwrap();
        let output = dir.path().join("report.xlsx");

        let args = ExportArgs {
            domain: None,
            json: Some(json_path),
            llm: Some("Provided analysis".to_string()),
            output: Some(output.clone()),
        };

        let code = handle_export(&args, &StackprobeConfig::default()).await;
        assert_eq!(code, EXIT_SUCCESS);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_lookup_rejects_empty_domain() {
        let args = LookupArgs {
            domain: "  ".to_string(),
            output: JsonStyle::Pretty,
            save: None,
        };
        assert_eq!(
            handle_lookup(&args, &StackprobeConfig::default()).await,
            EXIT_USAGE
        );
    }
}

//! Ollama client tests against a mock HTTP server

mod support;

use mockito::{Matcher, Server};
use serde_json::json;
use stackprobe::insight::{InsightBackend, InsightError, OllamaClient};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use support::unreachable_url;

fn client(endpoint: &str) -> OllamaClient {
    OllamaClient::with_timeout(endpoint, "llama3", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_chat_returns_message_content() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::Json(json!({
            "model": "llama3",
            "messages": [{"role": "user", "content": "Analyze this"}],
            "stream": false
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"model":"llama3","message":{"role":"assistant","content":"The site runs WordPress."},"done":true,"eval_count":12}"#,
        )
        .create_async()
        .await;

    let text = client(&server.url()).generate("Analyze this").await.unwrap();

    assert_eq!(text, "The site runs WordPress.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_model_is_model_not_found() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/chat")
        .with_status(404)
        .with_body(r#"{"error":"model \"llama3\" not found, try pulling it first"}"#)
        .create_async()
        .await;

    let err = client(&server.url()).generate("prompt").await.unwrap_err();
    assert_eq!(
        err,
        InsightError::ModelNotFound {
            model: "llama3".to_string()
        }
    );
    assert!(err.to_string().contains("ollama pull llama3"));
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/chat")
        .with_status(500)
        .with_body("out of memory")
        .create_async()
        .await;

    let err = client(&server.url()).generate("prompt").await.unwrap_err();
    match err {
        InsightError::Api {
            message,
            status_code,
        } => {
            assert_eq!(status_code, Some(500));
            assert!(message.contains("out of memory"));
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused_is_model_unavailable() {
    let err = client(&unreachable_url())
        .generate("prompt")
        .await
        .unwrap_err();
    assert!(matches!(err, InsightError::ModelUnavailable { .. }));
}

#[tokio::test]
async fn test_undecodable_body_is_invalid_response() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let err = client(&server.url()).generate("prompt").await.unwrap_err();
    assert!(matches!(err, InsightError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_streaming_forwards_chunks() {
    let stream_body = [
        r#"{"message":{"role":"assistant","content":"Word"},"done":false}"#,
        r#"{"message":{"role":"assistant","content":"Press"},"done":false}"#,
        r#"{"message":{"role":"assistant","content":" site"},"done":false}"#,
        r#"{"message":{"role":"assistant","content":""},"done":true}"#,
    ]
    .join("\n");
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "application/x-ndjson")
        .with_body(stream_body)
        .create_async()
        .await;

    let chunks = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink_chunks = chunks.clone();
    let client = client(&server.url()).with_streaming(Arc::new(move |chunk: &str| {
        sink_chunks.lock().unwrap().push(chunk.to_string());
    }));

    let text = client.generate("prompt").await.unwrap();

    assert_eq!(text, "WordPress site");
    assert_eq!(*chunks.lock().unwrap(), vec!["Word", "Press", " site"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_health_check_reports_installed_model() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"models":[{"name":"llama3:latest"},{"name":"tinyllama:latest"}]}"#)
        .create_async()
        .await;

    let health = client(&server.url()).health_check().await.unwrap();

    assert!(health.reachable);
    assert!(health.model_installed);
    assert_eq!(health.installed_models.len(), 2);
}

#[tokio::test]
async fn test_health_check_reports_missing_model() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models":[{"name":"mistral:7b"}]}"#)
        .create_async()
        .await;

    let health = client(&server.url()).health_check().await.unwrap();

    assert!(health.reachable);
    assert!(!health.model_installed);
}

#[tokio::test]
async fn test_health_check_unreachable() {
    let health = client(&unreachable_url()).health_check().await.unwrap();

    assert!(!health.reachable);
    assert!(!health.model_installed);
}

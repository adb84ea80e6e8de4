//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::net::TcpListener;

pub const BUILTWITH_PATH: &str = "/v22/api.json";

pub const EXAMPLE_RESPONSE: &str =
    r#"{"WordPress": [{"status":"live"}], "Nginx":[{"status":"live"}]}"#;

/// A local URL with nothing listening on it
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

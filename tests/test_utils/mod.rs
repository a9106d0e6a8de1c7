//! Test utilities for integration tests
use std::sync::{Arc, RwLock};

use axum::{Router, body::Body};

use ips_assistant::ai::completion::CompletionClient;
use ips_assistant::api::AppState;
use ips_assistant::api::app;
use ips_assistant::core::AppConfig;
use ips_assistant::gemini::GeminiClient;

pub const TEXT_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

/// Creates a test application router whose provider client talks to
/// `api_hostname`, typically a `mockito` server.
pub fn test_app(api_hostname: &str) -> Router {
    test_app_with_config(test_config(api_hostname))
}

pub fn test_config(api_hostname: &str) -> AppConfig {
    let mut app_config = AppConfig::new("test-api-key");
    app_config.gemini_api_hostname = api_hostname.to_string();
    app_config
}

pub fn test_app_with_config(app_config: AppConfig) -> Router {
    let client = GeminiClient::new(&app_config).expect("Failed to build client");
    test_app_with_client(Arc::new(client), app_config)
}

/// Creates a test application router backed by any completion client.
pub fn test_app_with_client(client: Arc<dyn CompletionClient>, app_config: AppConfig) -> Router {
    let app_state = AppState::new(client, app_config);
    app(Arc::new(RwLock::new(app_state)))
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not utf8")
}

pub fn text_response(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

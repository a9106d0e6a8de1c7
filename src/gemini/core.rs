use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::completion::CompletionError;

const API_KEY_HEADER: &str = "x-goog-api-key";
const API_VERSION: &str = "v1beta";

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "model")]
    Model,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: &str) -> Self {
        Part {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, text: &str) -> Self {
        Content {
            role: Some(role),
            parts: vec![Part::text(text)],
        }
    }

    /// Content without a role, as used for system instructions and
    /// single-shot prompts.
    pub fn prompt(text: &str) -> Self {
        Content {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

// {
//   "candidates": [{
//     "content": {"role": "model", "parts": [{"text": "Hello"}]},
//     "finishReason": "STOP"
//   }],
//   "usageMetadata": {...}
// }
#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate.
    pub fn parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// All text parts of the first candidate joined together, or
    /// `None` when there is no text at all.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }

    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.parts().iter().find_map(|p| p.inline_data.as_ref())
    }
}

#[derive(Deserialize, Debug)]
pub struct OperationError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// A long-running job handle as returned by `predictLongRunning` and
/// by polling the operation by name.
#[derive(Deserialize, Debug)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    pub error: Option<OperationError>,
    pub response: Option<Value>,
}

impl Operation {
    pub fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .pointer("/generateVideoResponse/generatedSamples/0/video/uri")?
            .as_str()
            .filter(|uri| !uri.is_empty())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

fn provider_error(status: StatusCode, body: &str) -> CompletionError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionError::Authentication(message),
        _ => CompletionError::Provider {
            status: status.as_u16(),
            message,
        },
    }
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CompletionError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(provider_error(status, &body));
    }

    serde_json::from_str::<T>(&body).map_err(|e| {
        tracing::error!("Parsing provider response failed for {}\nError:{}", body, e);
        CompletionError::MalformedResponse(e.to_string())
    })
}

fn model_url(api_hostname: &str, model: &str, method: &str) -> String {
    format!(
        "{}/{}/models/{}:{}",
        api_hostname.trim_end_matches('/'),
        API_VERSION,
        model,
        method
    )
}

pub async fn generate_content(
    http: &reqwest::Client,
    payload: &Value,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<GenerateContentResponse, CompletionError> {
    let url = model_url(api_hostname, model, "generateContent");
    let response = http
        .post(url)
        .header(API_KEY_HEADER, api_key)
        .timeout(Duration::from_secs(60 * 5))
        .json(payload)
        .send()
        .await?;

    parse_json(response).await
}

pub async fn predict_long_running(
    http: &reqwest::Client,
    payload: &Value,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<Operation, CompletionError> {
    let url = model_url(api_hostname, model, "predictLongRunning");
    let response = http
        .post(url)
        .header(API_KEY_HEADER, api_key)
        .timeout(Duration::from_secs(60))
        .json(payload)
        .send()
        .await?;

    parse_json(response).await
}

pub async fn get_operation(
    http: &reqwest::Client,
    name: &str,
    api_hostname: &str,
    api_key: &str,
) -> Result<Operation, CompletionError> {
    let url = format!(
        "{}/{}/{}",
        api_hostname.trim_end_matches('/'),
        API_VERSION,
        name.trim_start_matches('/')
    );
    let response = http
        .get(url)
        .header(API_KEY_HEADER, api_key)
        .timeout(Duration::from_secs(60))
        .send()
        .await?;

    parse_json(response).await
}

/// Fetches a generated file. The URI comes from the provider and
/// still needs the API key.
pub async fn download(
    http: &reqwest::Client,
    uri: &str,
    api_key: &str,
) -> Result<Vec<u8>, CompletionError> {
    let response = http
        .get(uri)
        .header(API_KEY_HEADER, api_key)
        .timeout(Duration::from_secs(60 * 10))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await?;
        return Err(provider_error(status, &body));
    }

    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), r#""model""#);
    }

    #[test]
    fn test_content_serialization() {
        let content = Content::new(Role::User, "Hello");
        assert_eq!(
            serde_json::to_string(&content).unwrap(),
            r#"{"role":"user","parts":[{"text":"Hello"}]}"#
        );

        let prompt = Content::prompt("Be nice");
        assert_eq!(
            serde_json::to_string(&prompt).unwrap(),
            r#"{"parts":[{"text":"Be nice"}]}"#
        );
    }

    #[test]
    fn test_inline_data_deserialization() {
        let json = r#"{"inlineData":{"mimeType":"image/png","data":"aGVsbG8="}}"#;
        let part: Part = serde_json::from_str(json).unwrap();
        let inline = part.inline_data.unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "aGVsbG8=");
        assert!(part.text.is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "School starts "}, {"text": "at 8am."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 12}
        }"#;
        let resp: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.text().as_deref(), Some("School starts at 8am."));
    }

    #[test]
    fn test_response_without_text() {
        let resp: GenerateContentResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(resp.text().is_none());
        assert!(resp.parts().is_empty());

        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
        )
        .unwrap();
        assert!(resp.text().is_none());

        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":""}]}}]}"#,
        )
        .unwrap();
        assert!(resp.text().is_none());
    }

    #[test]
    fn test_operation_video_uri() {
        let op: Operation = serde_json::from_value(json!({
            "name": "models/veo/operations/abc",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [{"video": {"uri": "https://example.com/v.mp4"}}]
                }
            }
        }))
        .unwrap();
        assert!(op.done);
        assert_eq!(op.video_uri(), Some("https://example.com/v.mp4"));

        let pending: Operation =
            serde_json::from_value(json!({"name": "models/veo/operations/abc"})).unwrap();
        assert!(!pending.done);
        assert!(pending.video_uri().is_none());
    }

    #[test]
    fn test_provider_error_mapping() {
        let body = r#"{"error":{"code":401,"message":"API key not valid","status":"UNAUTHENTICATED"}}"#;
        match provider_error(StatusCode::UNAUTHORIZED, body) {
            CompletionError::Authentication(msg) => assert_eq!(msg, "API key not valid"),
            other => panic!("Expected Authentication, got {:?}", other),
        }

        match provider_error(StatusCode::SERVICE_UNAVAILABLE, "overloaded") {
            CompletionError::Provider { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("Expected Provider, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_content_basic() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hi!"}]}}]}"#)
            .create_async()
            .await;

        let payload = json!({"contents": [Content::new(Role::User, "Hello")]});
        let result = generate_content(
            &reqwest::Client::new(),
            &payload,
            server.url().as_str(),
            "test-key",
            "gemini-test",
        )
        .await;

        mock.assert_async().await;
        assert_eq!(result.unwrap().text().as_deref(), Some("Hi!"));
    }

    #[tokio::test]
    async fn test_generate_content_malformed() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let result = generate_content(
            &reqwest::Client::new(),
            &json!({}),
            server.url().as_str(),
            "test-key",
            "gemini-test",
        )
        .await;

        assert!(matches!(result, Err(CompletionError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_generate_content_rejected_key() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"code":403,"message":"Permission denied"}}"#)
            .create_async()
            .await;

        let result = generate_content(
            &reqwest::Client::new(),
            &json!({}),
            server.url().as_str(),
            "bad-key",
            "gemini-test",
        )
        .await;

        assert!(matches!(result, Err(CompletionError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_download_error_status() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/v1beta/files/missing:download")
            .with_status(404)
            .with_body(r#"{"error":{"code":404,"message":"File not found"}}"#)
            .create_async()
            .await;

        let uri = format!("{}/v1beta/files/missing:download", server.url());
        let result = download(&reqwest::Client::new(), &uri, "test-key").await;

        match result {
            Err(CompletionError::Provider { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "File not found");
            }
            other => panic!("Expected Provider error, got {:?}", other),
        }
    }
}

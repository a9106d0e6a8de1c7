use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::core::{
    Content, GenerateContentResponse, Operation, Role, download, generate_content, get_operation,
    predict_long_running,
};
use crate::ai::completion::{ChatSession, CompletionClient, CompletionError, FALLBACK_REPLY};
use crate::core::AppConfig;

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
    Audio,
}

/// Output of one of the single-shot generation calls.
#[derive(Clone, Serialize, Debug)]
pub struct GeneratedAsset {
    pub id: String,
    pub kind: AssetKind,
    /// A `data:` URL for inline payloads, the provider's download URI
    /// for video.
    pub url: String,
    pub prompt: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl GeneratedAsset {
    fn new(kind: AssetKind, url: String, prompt: &str, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            kind,
            url,
            prompt: prompt.to_string(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Client for the Gemini REST API.
///
/// Use `GeminiClient::new` with an `AppConfig`; construction fails when
/// the API key is missing so that misconfiguration is caught before
/// the first request.
pub struct GeminiClient {
    http: reqwest::Client,
    api_hostname: String,
    api_key: String,
    text_model: String,
    image_model: String,
    video_model: String,
    speech_model: String,
    speech_voice: String,
    video_poll_interval: Duration,
    video_max_polls: u32,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Result<Self, CompletionError> {
        if config.gemini_api_key.trim().is_empty() {
            return Err(CompletionError::Configuration(
                "API key is missing".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            api_hostname: config.gemini_api_hostname.clone(),
            api_key: config.gemini_api_key.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            video_model: config.video_model.clone(),
            speech_model: config.speech_model.clone(),
            speech_voice: config.speech_voice.clone(),
            video_poll_interval: config.video_poll_interval,
            video_max_polls: config.video_max_polls,
        })
    }

    async fn generate(
        &self,
        payload: &serde_json::Value,
        model: &str,
    ) -> Result<GenerateContentResponse, CompletionError> {
        generate_content(&self.http, payload, &self.api_hostname, &self.api_key, model).await
    }

    /// Generates a single square still image and returns it as a PNG
    /// `data:` URL.
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedAsset, CompletionError> {
        let payload = json!({
            "contents": [Content::prompt(prompt)],
            "generationConfig": {
                "imageConfig": {"aspectRatio": "1:1"}
            }
        });
        let resp = self.generate(&payload, &self.image_model).await?;

        let inline = resp
            .first_inline_data()
            .ok_or(CompletionError::MissingPayload("image"))?;
        let bytes = decode(&inline.data)?;
        let url = format!("data:image/png;base64,{}", inline.data);

        tracing::debug!("Generated image for prompt ({} bytes)", bytes.len());
        Ok(GeneratedAsset::new(AssetKind::Image, url, prompt, bytes))
    }

    /// Generates speech for `text` with the configured prebuilt voice.
    /// The payload is raw PCM audio.
    pub async fn generate_speech(&self, text: &str) -> Result<GeneratedAsset, CompletionError> {
        let payload = json!({
            "contents": [Content::prompt(&format!("Say clearly: {}", text))],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": {"voiceName": self.speech_voice}
                    }
                }
            }
        });
        let resp = self.generate(&payload, &self.speech_model).await?;

        let inline = resp
            .parts()
            .first()
            .and_then(|p| p.inline_data.as_ref())
            .filter(|d| !d.data.is_empty())
            .ok_or(CompletionError::MissingPayload("audio"))?;
        let bytes = decode(&inline.data)?;
        let url = format!("data:{};base64,{}", inline.mime_type, inline.data);

        Ok(GeneratedAsset::new(AssetKind::Audio, url, text, bytes))
    }

    /// Starts a video job, polls it until done and downloads the
    /// result. Progress messages are sent on `progress` when given.
    ///
    /// Polling waits `video_poll_interval` before each poll and gives
    /// up with `DeadlineExceeded` after `video_max_polls` polls.
    pub async fn generate_video(
        &self,
        prompt: &str,
        progress: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<GeneratedAsset, CompletionError> {
        let notify = |msg: &str| {
            if let Some(tx) = &progress {
                // The receiver going away shouldn't stop the job
                let _ = tx.send(msg.to_string());
            }
        };

        notify("Initiating video generation...");
        let payload = json!({
            "instances": [{"prompt": prompt}],
            "parameters": {
                "sampleCount": 1,
                "resolution": "720p",
                "aspectRatio": "16:9"
            }
        });
        let operation = predict_long_running(
            &self.http,
            &payload,
            &self.api_hostname,
            &self.api_key,
            &self.video_model,
        )
        .await?;
        tracing::info!("Started video operation {}", operation.name);

        notify("Processing video frames (this can take a few minutes)...");
        let client = self;
        let operation = poll_until_done(
            operation,
            self.video_poll_interval,
            self.video_max_polls,
            move |name| async move {
                get_operation(&client.http, &name, &client.api_hostname, &client.api_key).await
            },
        )
        .await?;

        if let Some(err) = &operation.error {
            return Err(CompletionError::Provider {
                // google.rpc codes outside the u16 range map to 0
                status: err.code.and_then(|c| u16::try_from(c).ok()).unwrap_or_default(),
                message: err.message.clone(),
            });
        }

        let uri = operation
            .video_uri()
            .ok_or(CompletionError::MissingPayload("video"))?
            .to_string();

        notify("Downloading final video file...");
        let bytes = download(&self.http, &uri, &self.api_key).await?;

        Ok(GeneratedAsset::new(AssetKind::Video, uri, prompt, bytes))
    }
}

fn decode(data: &str) -> Result<Vec<u8>, CompletionError> {
    STANDARD
        .decode(data)
        .map_err(|e| CompletionError::MalformedResponse(format!("Invalid base64 payload: {}", e)))
}

#[async_trait]
impl CompletionClient for GeminiClient {
    fn create_session(&self, system_instruction: &str) -> Result<ChatSession, CompletionError> {
        ChatSession::new(&self.text_model, system_instruction)
    }

    async fn send(&self, session: &mut ChatSession, text: &str) -> Result<String, CompletionError> {
        let user_turn = Content::new(Role::User, text);

        let mut contents = session.history.clone();
        contents.push(user_turn.clone());
        let payload = json!({
            "systemInstruction": Content::prompt(session.system_instruction()),
            "contents": contents,
        });

        let resp = self.generate(&payload, session.model()).await?;

        match resp.text() {
            Some(reply) => {
                session.history.push(user_turn);
                session.history.push(Content::new(Role::Model, &reply));
                Ok(reply)
            }
            None => {
                tracing::warn!("Response for session {} had no text", session.id());
                Ok(FALLBACK_REPLY.to_string())
            }
        }
    }
}

/// Waits `interval` before each poll until the operation is done.
/// Gives up with `DeadlineExceeded` once `max_polls` polls have been
/// made.
async fn poll_until_done<F, Fut>(
    mut operation: Operation,
    interval: Duration,
    max_polls: u32,
    mut poll: F,
) -> Result<Operation, CompletionError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Operation, CompletionError>>,
{
    let mut attempts = 0;
    while !operation.done {
        if attempts >= max_polls {
            tracing::warn!(
                "Video operation {} not done after {} polls",
                operation.name,
                attempts
            );
            return Err(CompletionError::DeadlineExceeded { attempts });
        }
        tokio::time::sleep(interval).await;
        attempts += 1;
        operation = poll(operation.name.clone()).await?;
        tracing::debug!(
            "Polled video operation {} (attempt {}, done={})",
            operation.name,
            attempts,
            operation.done
        );
    }
    Ok(operation)
}

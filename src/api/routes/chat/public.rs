//! Public types for the chat API
use serde::{Deserialize, Serialize};

use crate::ai::chat::Message;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: Message,
}

#[derive(Serialize, Deserialize)]
pub struct ChatSessionResponse {
    pub session_id: String,
    pub transcript: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
pub struct ChatTranscriptResponse {
    pub transcript: Vec<Message>,
}

//! The contract between the chat controller and a remote
//! text-generation provider.
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::gemini::Content;

/// Substituted when a successful response carries no text.
pub const FALLBACK_REPLY: &str = "I'm having a connection issue.";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authentication rejected by provider: {0}")]
    Authentication(String),

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("No {0} data found in response")]
    MissingPayload(&'static str),

    #[error("Deadline exceeded after {attempts} attempts")]
    DeadlineExceeded { attempts: u32 },
}

/// Provider-side conversational context for one conversation.
///
/// The provider is stateless over HTTP so prior turns are held here
/// and replayed with each request. Only successful exchanges are
/// recorded.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    model: String,
    system_instruction: String,
    pub(crate) history: Vec<Content>,
}

impl ChatSession {
    pub fn new(model: &str, system_instruction: &str) -> Result<Self, CompletionError> {
        if system_instruction.trim().is_empty() {
            return Err(CompletionError::InvalidRequest(
                "system instruction must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            model: model.to_string(),
            system_instruction: system_instruction.to_string(),
            history: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Number of turns (user and model) retained for replay.
    pub fn turns(&self) -> usize {
        self.history.len()
    }
}

/// Translates one outgoing user utterance into one provider reply.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Opens a session bound to the client's text model and the given
    /// instruction.
    fn create_session(&self, system_instruction: &str) -> Result<ChatSession, CompletionError>;

    /// Sends `text` in the context of `session`. Exactly one remote
    /// call is made. On error the session is left as it was.
    async fn send(&self, session: &mut ChatSession, text: &str) -> Result<String, CompletionError>;
}

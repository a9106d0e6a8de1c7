use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use thiserror::Error;

use super::models::{ConversationStore, Message, Role};
use crate::ai::completion::{ChatSession, CompletionClient, CompletionError};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyInput,

    #[error("A message is already being answered")]
    Busy,

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// How provider sessions relate to a conversation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionMode {
    /// One session for the whole conversation so the assistant sees
    /// prior turns.
    #[default]
    PerConversation,
    /// A fresh session for every message. The assistant has no memory
    /// of earlier turns.
    PerMessage,
}

impl FromStr for SessionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conversation" => Ok(SessionMode::PerConversation),
            "message" => Ok(SessionMode::PerMessage),
            other => Err(anyhow!(
                "Unknown session mode {}, expected conversation or message",
                other
            )),
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionMode::PerConversation => write!(f, "conversation"),
            SessionMode::PerMessage => write!(f, "message"),
        }
    }
}

/// Clears the in-flight flag when dropped, including when the submit
/// future is cancelled.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The chat widget's controller: owns the transcript and the provider
/// session for one UI session.
///
/// At most one message is in flight at a time. Appends go through a
/// mutex so a `Chat` can be shared across tasks.
///
/// Use `ChatBuilder` to construct a valid `Chat`.
pub struct Chat {
    client: Arc<dyn CompletionClient>,
    system_instruction: String,
    session_mode: SessionMode,
    // Only set in per-conversation mode. Held across the provider call
    // so a cancelled submit leaves the session in place.
    session: Option<tokio::sync::Mutex<ChatSession>>,
    store: Mutex<ConversationStore>,
    in_flight: AtomicBool,
}

impl Chat {
    fn store(&self) -> MutexGuard<'_, ConversationStore> {
        // The store is append-only so a panic elsewhere can't leave it
        // half-written
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the transcript in display order.
    pub fn transcript(&self) -> Vec<Message> {
        self.store().all()
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    /// True while a reply is pending (the typing indicator).
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn session_mode(&self) -> SessionMode {
        self.session_mode
    }

    /// Submits the user's text and returns the assistant's reply once
    /// it has been appended to the transcript.
    ///
    /// Whitespace-only input and submits made while another is in
    /// flight are rejected without touching the transcript. When the
    /// provider fails only the user's message remains; the error is
    /// returned for the caller to surface or not.
    pub async fn submit(&self, text: &str) -> Result<Message, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        let _guard = InFlight::acquire(&self.in_flight).ok_or(ChatError::Busy)?;

        self.store().append(Message::new(Role::User, text));

        let result = match &self.session {
            Some(session) => {
                let mut session = session.lock().await;
                self.client.send(&mut session, text).await
            }
            None => {
                let mut session = self
                    .client
                    .create_session(&self.system_instruction)
                    .inspect_err(|e| {
                        tracing::error!("Failed to create chat session: {}", e);
                    })?;
                self.client.send(&mut session, text).await
            }
        };

        match result {
            Ok(reply) => {
                let msg = Message::new(Role::Model, &reply);
                self.store().append(msg.clone());
                Ok(msg)
            }
            Err(e) => {
                tracing::error!("Chat completion failed: {}", e);
                Err(ChatError::Completion(e))
            }
        }
    }
}

pub struct ChatBuilder {
    client: Arc<dyn CompletionClient>,
    system_instruction: String,
    session_mode: SessionMode,
    transcript: ConversationStore,
}

impl ChatBuilder {
    pub fn new(client: Arc<dyn CompletionClient>, system_instruction: &str) -> Self {
        Self {
            client,
            system_instruction: system_instruction.to_string(),
            session_mode: SessionMode::default(),
            transcript: ConversationStore::new(),
        }
    }

    /// Seeds the transcript with a model greeting.
    pub fn greeting(mut self, greeting: &str) -> Self {
        self.transcript.append(Message::new(Role::Model, greeting));
        self
    }

    pub fn transcript(mut self, messages: Vec<Message>) -> Self {
        self.transcript = ConversationStore::new_with_messages(messages);
        self
    }

    pub fn session_mode(mut self, mode: SessionMode) -> Self {
        self.session_mode = mode;
        self
    }

    /// Fails when the system instruction is empty. In per-conversation
    /// mode the session is opened here.
    pub fn build(self) -> Result<Chat, ChatError> {
        let session = match self.session_mode {
            SessionMode::PerConversation => {
                let session = self.client.create_session(&self.system_instruction)?;
                Some(tokio::sync::Mutex::new(session))
            }
            SessionMode::PerMessage => {
                if self.system_instruction.trim().is_empty() {
                    return Err(ChatError::Completion(CompletionError::InvalidRequest(
                        "system instruction must not be empty".to_string(),
                    )));
                }
                None
            }
        };

        Ok(Chat {
            client: self.client,
            system_instruction: self.system_instruction,
            session_mode: self.session_mode,
            session,
            store: Mutex::new(self.transcript),
            in_flight: AtomicBool::new(false),
        })
    }
}

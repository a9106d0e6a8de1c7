//! The core models for keeping the transcript of a chat with the
//! assistant.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::gemini::Role;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    /// Time-ordered (UUIDv7) so ids sort in creation order.
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            id: Uuid::now_v7().to_string(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only transcript. Insertion order is display order.
#[derive(Default, Debug, Clone)]
pub struct ConversationStore(Vec<Message>);

impl ConversationStore {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// A store seeded with the assistant's greeting.
    pub fn with_greeting(greeting: &str) -> Self {
        let mut store = Self::new();
        store.append(Message::new(Role::Model, greeting));
        store
    }

    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        let mut store = Self::new();
        for m in messages {
            store.append(m);
        }
        store
    }

    /// Timestamps never go backwards: an entry stamped earlier than
    /// the previous one takes the previous timestamp.
    pub fn append(&mut self, mut msg: Message) {
        if let Some(last) = self.0.last()
            && msg.timestamp < last.timestamp
        {
            msg.timestamp = last.timestamp;
        }
        self.0.push(msg)
    }

    pub fn all(&self) -> Vec<Message> {
        self.0.clone()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }
}

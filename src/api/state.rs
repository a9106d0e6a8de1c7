use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::ai::chat::{Chat, ChatBuilder, ChatError};
use crate::ai::completion::CompletionClient;
use crate::core::AppConfig;

pub struct AppState {
    // One chat per UI session, kept in memory only. Keys are UUIDv7 so
    // the first entry is always the oldest session.
    pub sessions: BTreeMap<String, Arc<Chat>>,
    pub client: Arc<dyn CompletionClient>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(client: Arc<dyn CompletionClient>, config: AppConfig) -> Self {
        Self {
            sessions: BTreeMap::new(),
            client,
            config,
        }
    }

    /// A new chat seeded with the configured greeting.
    pub fn new_chat(&self) -> Result<Chat, ChatError> {
        ChatBuilder::new(Arc::clone(&self.client), &self.config.system_message)
            .greeting(&self.config.greeting)
            .session_mode(self.config.session_mode)
            .build()
    }

    /// Stores `chat` under a new session id, evicting the oldest
    /// sessions so no more than `max_sessions` are kept.
    pub fn insert_chat(&mut self, chat: Chat) -> String {
        while self.sessions.len() >= self.config.max_sessions.max(1) {
            if let Some((id, _)) = self.sessions.pop_first() {
                tracing::debug!("Evicted chat session {}", id);
            }
        }
        let session_id = Uuid::now_v7().to_string();
        self.sessions.insert(session_id.clone(), Arc::new(chat));
        session_id
    }
}

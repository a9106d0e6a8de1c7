mod core;
mod models;

pub use self::core::{Chat, ChatBuilder, ChatError, SessionMode};
pub use models::{ConversationStore, Message, Role};

mod config;
pub use config::{AppConfig, DEFAULT_GEMINI_API_HOSTNAME, DEFAULT_GREETING, DEFAULT_SYSTEM_MESSAGE};

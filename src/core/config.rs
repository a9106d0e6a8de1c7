use std::env;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};

use crate::ai::chat::SessionMode;

pub const DEFAULT_GEMINI_API_HOSTNAME: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are IPS assistant. Be professional, friendly, and helpful about Iqra Public School Gogera Campus.";
pub const DEFAULT_GREETING: &str =
    "Assalamu Alaikum! I'm your IPS Assistant. How can I help you today?";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini_api_hostname: String,
    pub gemini_api_key: String,
    pub text_model: String,
    pub image_model: String,
    pub video_model: String,
    pub speech_model: String,
    pub speech_voice: String,
    pub system_message: String,
    pub greeting: String,
    pub session_mode: SessionMode,
    pub video_poll_interval: Duration,
    pub video_max_polls: u32,
    /// Chat sessions the API keeps before evicting the oldest.
    pub max_sessions: usize,
}

impl AppConfig {
    /// Config with every setting at its default except the API key.
    pub fn new(api_key: &str) -> Self {
        Self {
            gemini_api_hostname: DEFAULT_GEMINI_API_HOSTNAME.to_string(),
            gemini_api_key: api_key.to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            video_model: "veo-3.1-fast-generate-preview".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            speech_voice: "Kore".to_string(),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            session_mode: SessionMode::default(),
            video_poll_interval: Duration::from_secs(10),
            video_max_polls: 60,
            max_sessions: 1000,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source. A missing API key
    /// is an error here so that it surfaces at startup rather than on
    /// the first request to the provider.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("Missing env var GEMINI_API_KEY"))?;

        let mut config = Self::new(&api_key);

        if let Some(host) = lookup("IPS_GEMINI_HOST") {
            config.gemini_api_hostname = host;
        }
        if let Some(model) = lookup("IPS_TEXT_MODEL") {
            config.text_model = model;
        }
        if let Some(model) = lookup("IPS_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Some(model) = lookup("IPS_VIDEO_MODEL") {
            config.video_model = model;
        }
        if let Some(model) = lookup("IPS_SPEECH_MODEL") {
            config.speech_model = model;
        }
        if let Some(voice) = lookup("IPS_SPEECH_VOICE") {
            config.speech_voice = voice;
        }
        if let Some(msg) = lookup("IPS_SYSTEM_MESSAGE") {
            if msg.trim().is_empty() {
                bail!("IPS_SYSTEM_MESSAGE must not be empty");
            }
            config.system_message = msg;
        }
        if let Some(greeting) = lookup("IPS_GREETING") {
            config.greeting = greeting;
        }
        if let Some(mode) = lookup("IPS_SESSION_MODE") {
            config.session_mode = mode.parse()?;
        }
        if let Some(secs) = lookup("IPS_VIDEO_POLL_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| anyhow!("Invalid IPS_VIDEO_POLL_SECS {}: {}", secs, e))?;
            config.video_poll_interval = Duration::from_secs(secs);
        }
        if let Some(max) = lookup("IPS_VIDEO_MAX_POLLS") {
            let max: u32 = max
                .parse()
                .map_err(|e| anyhow!("Invalid IPS_VIDEO_MAX_POLLS {}: {}", max, e))?;
            if max == 0 {
                bail!("IPS_VIDEO_MAX_POLLS must be at least 1");
            }
            config.video_max_polls = max;
        }
        if let Some(max) = lookup("IPS_MAX_SESSIONS") {
            let max: usize = max
                .parse()
                .map_err(|e| anyhow!("Invalid IPS_MAX_SESSIONS {}: {}", max, e))?;
            if max == 0 {
                bail!("IPS_MAX_SESSIONS must be at least 1");
            }
            config.max_sessions = max;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let result = AppConfig::from_lookup(lookup_from(&[]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_is_an_error() {
        let result = AppConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "  ")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_legacy_api_key_var() {
        let config = AppConfig::from_lookup(lookup_from(&[("API_KEY", "legacy")])).unwrap();
        assert_eq!(config.gemini_api_key, "legacy");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.gemini_api_hostname, DEFAULT_GEMINI_API_HOSTNAME);
        assert_eq!(config.system_message, DEFAULT_SYSTEM_MESSAGE);
        assert_eq!(config.greeting, DEFAULT_GREETING);
        assert_eq!(config.session_mode, SessionMode::PerConversation);
        assert_eq!(config.video_poll_interval, Duration::from_secs(10));
        assert_eq!(config.video_max_polls, 60);
        assert_eq!(config.max_sessions, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "k"),
            ("IPS_GEMINI_HOST", "http://localhost:9999"),
            ("IPS_TEXT_MODEL", "gemini-test"),
            ("IPS_SESSION_MODE", "message"),
            ("IPS_VIDEO_POLL_SECS", "2"),
            ("IPS_VIDEO_MAX_POLLS", "5"),
            ("IPS_MAX_SESSIONS", "50"),
        ]))
        .unwrap();
        assert_eq!(config.gemini_api_hostname, "http://localhost:9999");
        assert_eq!(config.text_model, "gemini-test");
        assert_eq!(config.session_mode, SessionMode::PerMessage);
        assert_eq!(config.video_poll_interval, Duration::from_secs(2));
        assert_eq!(config.video_max_polls, 5);
        assert_eq!(config.max_sessions, 50);
    }

    #[test]
    fn test_invalid_values() {
        assert!(
            AppConfig::from_lookup(lookup_from(&[
                ("GEMINI_API_KEY", "k"),
                ("IPS_VIDEO_MAX_POLLS", "0"),
            ]))
            .is_err()
        );
        assert!(
            AppConfig::from_lookup(lookup_from(&[
                ("GEMINI_API_KEY", "k"),
                ("IPS_SESSION_MODE", "sometimes"),
            ]))
            .is_err()
        );
        assert!(
            AppConfig::from_lookup(lookup_from(&[
                ("GEMINI_API_KEY", "k"),
                ("IPS_SYSTEM_MESSAGE", ""),
            ]))
            .is_err()
        );
        assert!(
            AppConfig::from_lookup(lookup_from(&[
                ("GEMINI_API_KEY", "k"),
                ("IPS_MAX_SESSIONS", "0"),
            ]))
            .is_err()
        );
    }
}

//! Configuration types for the assistant.

use crate::conversation::ledger::FileType;
use crate::persona::PersonaProfile;
use crate::speech::VoiceOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides [`AssistantConfig::default_config_path`].
pub const CONFIG_PATH_ENV: &str = "PARLOR_CONFIG";

/// Top-level configuration for the assistant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Who the assistant is talking to and how.
    pub persona: PersonaProfile,
    /// Voice settings handed to the playback provider.
    pub voice: VoiceOptions,
    /// Artificial "thinking" latency before replies.
    pub thinking: ThinkingConfig,
    /// Turn-taking behaviour for pending actions.
    pub conversation: ConversationConfig,
}

/// Artificial response latency, purely for UX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinkingConfig {
    /// When false, replies are computed immediately.
    pub enabled: bool,
    /// Base delay before an ordinary reply, in milliseconds.
    pub reply_base_ms: u64,
    /// Upper bound of the random jitter added to `reply_base_ms`.
    pub reply_jitter_ms: u64,
    /// Delay before a fulfillment confirmation, in milliseconds.
    pub fulfillment_ms: u64,
}

impl Default for ThinkingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reply_base_ms: 800,
            reply_jitter_ms: 400,
            fulfillment_ms: 600,
        }
    }
}

/// What to do when a pending action receives empty content.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyFulfillmentPolicy {
    /// Keep the pending action open and ask for the content again.
    #[default]
    Reprompt,
    /// Create the (empty) ledger entry anyway and close the action.
    Accept,
}

/// Pending-action behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Whether an exact "cancel" / "never mind" reply aborts a pending action.
    ///
    /// When disabled every utterance after a create request is treated as
    /// fulfillment content.
    pub cancel_phrases: bool,
    /// Policy for empty fulfillment content.
    pub empty_fulfillment: EmptyFulfillmentPolicy,
    /// File type used when the create request did not name one.
    pub default_file_type: FileType,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            cancel_phrases: true,
            empty_fulfillment: EmptyFulfillmentPolicy::default(),
            default_file_type: FileType::Txt,
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::AssistantError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AssistantError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `$PARLOR_CONFIG`, else the default path if it exists, else defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load_or_default() -> crate::error::Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::from_file(std::path::Path::new(&path));
        }
        let path = Self::default_config_path();
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path: `<config dir>/parlor/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp/parlor-config"))
            .join("parlor")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AssistantConfig::default();
        assert!(config.thinking.enabled);
        assert!(config.thinking.reply_base_ms > 0);
        assert!(config.conversation.cancel_phrases);
        assert_eq!(
            config.conversation.empty_fulfillment,
            EmptyFulfillmentPolicy::Reprompt
        );
        assert_eq!(config.conversation.default_file_type, FileType::Txt);
        assert_eq!(config.persona.language, "en");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AssistantConfig::default();
        config.persona.name = "Ada".to_owned();
        config.thinking.enabled = false;
        config.conversation.empty_fulfillment = EmptyFulfillmentPolicy::Accept;
        config.voice.rate = 1.25;

        config.save_to_file(&path).expect("save config");
        let loaded = AssistantConfig::from_file(&path).expect("load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result =
            AssistantConfig::from_file(std::path::Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn from_file_invalid_toml_returns_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").expect("write");

        match AssistantConfig::from_file(&path) {
            Err(crate::error::AssistantError::Config(_)) => {}
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml_str = r#"
[conversation]
empty_fulfillment = "accept"
default_file_type = "pdf"
"#;
        let config: AssistantConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.conversation.empty_fulfillment,
            EmptyFulfillmentPolicy::Accept
        );
        assert_eq!(config.conversation.default_file_type, FileType::Pdf);
        assert!(config.conversation.cancel_phrases);
        assert_eq!(config.thinking, ThinkingConfig::default());
        assert_eq!(config.persona, PersonaProfile::default());
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = AssistantConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("parlor"));
    }
}

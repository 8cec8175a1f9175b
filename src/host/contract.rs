//! Versioned command/response/event envelopes for rendering-layer hosts.
//!
//! A host (desktop shell, browser bridge, test harness) drives the
//! assistant by sending [`CommandEnvelope`]s and receives one
//! [`ResponseEnvelope`] per command plus a stream of [`EventEnvelope`]s
//! describing every state change.

use serde::{Deserialize, Serialize};

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Commands a host can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "host.version")]
    HostVersion,
    #[serde(rename = "runtime.stop")]
    RuntimeStop,
    #[serde(rename = "conversation.send")]
    ConversationSend,
    #[serde(rename = "conversation.snapshot")]
    ConversationSnapshot,
    #[serde(rename = "speech.listen_toggle")]
    SpeechListenToggle,
    #[serde(rename = "speech.result")]
    SpeechResult,
    #[serde(rename = "speech.error")]
    SpeechError,
    #[serde(rename = "speech.end")]
    SpeechEnd,
    #[serde(rename = "speech.stop_speaking")]
    SpeechStopSpeaking,
    #[serde(rename = "task.toggle")]
    TaskToggle,
    #[serde(rename = "task.delete")]
    TaskDelete,
    #[serde(rename = "file.delete")]
    FileDelete,
    #[serde(rename = "file.download")]
    FileDownload,
    #[serde(rename = "file.send")]
    FileSend,
}

impl CommandName {
    /// Every command, in wire-documentation order.
    pub const ALL: [Self; 15] = [
        Self::HostPing,
        Self::HostVersion,
        Self::RuntimeStop,
        Self::ConversationSend,
        Self::ConversationSnapshot,
        Self::SpeechListenToggle,
        Self::SpeechResult,
        Self::SpeechError,
        Self::SpeechEnd,
        Self::SpeechStopSpeaking,
        Self::TaskToggle,
        Self::TaskDelete,
        Self::FileDelete,
        Self::FileDownload,
        Self::FileSend,
    ];

    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostPing => "host.ping",
            Self::HostVersion => "host.version",
            Self::RuntimeStop => "runtime.stop",
            Self::ConversationSend => "conversation.send",
            Self::ConversationSnapshot => "conversation.snapshot",
            Self::SpeechListenToggle => "speech.listen_toggle",
            Self::SpeechResult => "speech.result",
            Self::SpeechError => "speech.error",
            Self::SpeechEnd => "speech.end",
            Self::SpeechStopSpeaking => "speech.stop_speaking",
            Self::TaskToggle => "task.toggle",
            Self::TaskDelete => "task.delete",
            Self::FileDelete => "file.delete",
            Self::FileDownload => "file.download",
            Self::FileSend => "file.send",
        }
    }

    /// Parse a command name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == raw)
    }
}

/// A versioned response envelope from assistant -> host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned command envelope from host -> assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != EVENT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned event envelope from assistant -> host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl From<ContractError> for crate::error::AssistantError {
    fn from(e: ContractError) -> Self {
        Self::Contract(e.to_string())
    }
}

//! Events broadcast by the session actor to renderers.

use crate::conversation::ledger::{CreatedFile, Task};
use crate::conversation::message::Message;
use crate::conversation::state::PendingAction;
use crate::speech::VoiceOptions;
use serde::{Deserialize, Serialize};

/// Something observable changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    MessageAppended { message: Message },
    TypingChanged { typing: bool },
    ListeningChanged { listening: bool },
    SpeakingChanged { speaking: bool },
    /// Display-only partial transcript while listening.
    InterimTranscript { transcript: String },
    /// The playback provider was asked to speak `text`.
    SpeechRequested { text: String, voice: VoiceOptions },
    TasksChanged { tasks: Vec<Task> },
    FilesChanged { files: Vec<CreatedFile> },
    PendingActionChanged { pending: Option<PendingAction> },
}

impl SessionEvent {
    /// Dotted wire name used by the host bridge.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageAppended { .. } => "message.appended",
            Self::TypingChanged { .. } => "typing.changed",
            Self::ListeningChanged { .. } => "listening.changed",
            Self::SpeakingChanged { .. } => "speaking.changed",
            Self::InterimTranscript { .. } => "transcript.interim",
            Self::SpeechRequested { .. } => "speech.requested",
            Self::TasksChanged { .. } => "tasks.changed",
            Self::FilesChanged { .. } => "files.changed",
            Self::PendingActionChanged { .. } => "pending_action.changed",
        }
    }

    /// Event body without the enum tag.
    pub fn payload(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(mut value) => value
                .get_mut("payload")
                .map(serde_json::Value::take)
                .unwrap_or(serde_json::Value::Null),
            Err(_) => serde_json::Value::Null,
        }
    }
}

//! Conversation state: transcript, ledgers, turn state and UI flags.

use super::ledger::{CreatedFile, FileLedger, Task, TaskLedger};
use super::message::{Message, Metadata};
use serde::{Deserialize, Serialize};

/// Follow-up action requested by a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateFile,
    CreateTask,
}

impl ActionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateFile => "create_file",
            Self::CreateTask => "create_task",
        }
    }
}

/// A commitment that the next utterance is content for `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// Turn-taking state. At most one pending action exists by construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TurnState {
    #[default]
    Idle,
    AwaitingFulfillment(PendingAction),
}

impl TurnState {
    pub fn pending(&self) -> Option<&PendingAction> {
        match self {
            Self::Idle => None,
            Self::AwaitingFulfillment(action) => Some(action),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Everything the renderer observes. Owned by the state machine; renderers
/// only ever see a [`ConversationSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub(crate) messages: Vec<Message>,
    pub(crate) tasks: TaskLedger,
    pub(crate) files: FileLedger,
    pub(crate) turn: TurnState,
    pub(crate) listening: bool,
    pub(crate) speaking: bool,
    pub(crate) voice_supported: bool,
    pub(crate) interim_transcript: String,
}

impl ConversationState {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn tasks(&self) -> &TaskLedger {
        &self.tasks
    }

    pub fn files(&self) -> &FileLedger {
        &self.files
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn interim_transcript(&self) -> &str {
        &self.interim_transcript
    }

    /// Clone the observable state for a renderer.
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            tasks: self.tasks.iter().cloned().collect(),
            files: self.files.iter().cloned().collect(),
            pending_action: self.turn.pending().cloned(),
            listening: self.listening,
            speaking: self.speaking,
            voice_supported: self.voice_supported,
            interim_transcript: self.interim_transcript.clone(),
        }
    }
}

/// Point-in-time copy of [`ConversationState`] for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub tasks: Vec<Task>,
    pub files: Vec<CreatedFile>,
    pub pending_action: Option<PendingAction>,
    pub listening: bool,
    pub speaking: bool,
    /// Whether the capture provider can listen at all. Hosts hide the
    /// microphone control when this is false.
    #[serde(default)]
    pub voice_supported: bool,
    pub interim_transcript: String,
}

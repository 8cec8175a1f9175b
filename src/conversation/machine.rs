//! The conversation state machine.

use super::clock::{Clock, SystemClock};
use super::ledger::{CreatedFile, FileType, Task, TaskStatus};
use super::message::{Message, MessageKind, Metadata, first_sentence, spoken_summary};
use super::state::{
    ActionKind, ConversationSnapshot, ConversationState, PendingAction, TurnState,
};
use crate::config::{AssistantConfig, ConversationConfig, EmptyFulfillmentPolicy};
use crate::error::{AssistantError, Result};
use crate::intent::is_cancel_phrase;
use crate::persona::{PersonaProfile, STARTUP_MESSAGE, STARTUP_SPEECH};
use crate::response::{META_FILE_TYPE, META_FULFILLS, ReplyContext, generate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reply appended when a pending action is cancelled.
pub const CANCELLED_REPLY: &str = "Okay, I've cancelled that. What would you like to do instead?";

/// How a turn was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// Ordinary exchange through the response generator.
    Reply,
    /// The utterance fulfilled a pending action.
    Fulfillment,
    /// The utterance cancelled a pending action.
    Cancelled,
    /// Empty content was rejected; the pending action stays open.
    Reprompt,
}

/// Ledger entry created by a fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerChange {
    TaskAdded { task: Task },
    FileAdded { file: CreatedFile },
}

/// Handle for an utterance recorded by [`Conversation::record_user`].
#[derive(Debug, Clone)]
pub struct UserTurn {
    pub message: Message,
    history_len: usize,
}

impl UserTurn {
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

/// Result of one fully processed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub kind: TurnKind,
    /// The agent message appended to the transcript.
    pub reply: Message,
    /// Text to hand to the playback provider.
    pub speech: Option<String>,
    pub ledger_change: Option<LedgerChange>,
}

/// Plain-text payload of a created file, ready to save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDownload {
    pub name: String,
    pub mime_type: String,
    pub content: String,
}

/// Result of a download or simulated send.
#[derive(Debug, Clone)]
pub struct FileDelivery {
    pub download: FileDownload,
    /// Confirmation messages appended to the transcript, in order.
    pub appended: Vec<Message>,
    pub speech: String,
}

/// Single-owner conversation engine.
///
/// Every mutation goes through `&mut self`, so utterances are processed one
/// at a time in submission order. Not meant to be shared across threads
/// without a single owning actor (see [`crate::session`]).
pub struct Conversation {
    state: ConversationState,
    persona: PersonaProfile,
    settings: ConversationConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("state", &self.state)
            .field("persona", &self.persona)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Conversation {
    /// Create an empty conversation using the system clock.
    pub fn new(config: &AssistantConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an empty conversation with an injected clock.
    pub fn with_clock(config: &AssistantConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ConversationState::default(),
            persona: config.persona.clone(),
            settings: config.conversation.clone(),
            clock,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.state.snapshot()
    }

    pub fn pending_action(&self) -> Option<&PendingAction> {
        self.state.turn.pending()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    fn push(&mut self, message: Message) -> Message {
        self.state.messages.push(message.clone());
        message
    }

    /// Append the welcome message. Returns it with the text to speak.
    pub fn startup(&mut self) -> (Message, String) {
        let message = Message::agent(STARTUP_MESSAGE, self.timestamp());
        (self.push(message), STARTUP_SPEECH.to_owned())
    }

    /// Process one utterance end to end.
    pub fn submit(&mut self, text: &str) -> TurnOutcome {
        let turn = self.record_user(text);
        self.respond(&turn)
    }

    /// First half of a turn: append the user's message.
    ///
    /// Content for an open pending action is tagged with [`META_FULFILLS`]
    /// so later replies don't read it as conversation.
    pub fn record_user(&mut self, text: &str) -> UserTurn {
        let history_len = self.state.messages.len();
        let mut message = Message::user(text, self.timestamp());
        if let Some(pending) = self.state.turn.pending() {
            let mut metadata = Metadata::new();
            metadata.insert(META_FULFILLS.to_owned(), pending.kind.as_str().into());
            message = message.with_metadata(metadata);
        }
        let message = self.push(message);
        UserTurn {
            message,
            history_len,
        }
    }

    /// Second half of a turn: route the recorded utterance and append the reply.
    pub fn respond(&mut self, turn: &UserTurn) -> TurnOutcome {
        match std::mem::take(&mut self.state.turn) {
            TurnState::Idle => self.reply_to(turn),
            TurnState::AwaitingFulfillment(action) => self.fulfill(action, turn.text()),
        }
    }

    fn reply_to(&mut self, turn: &UserTurn) -> TurnOutcome {
        let history_len = turn.history_len.min(self.state.messages.len());
        let reply = {
            let ctx = ReplyContext {
                history: &self.state.messages[..history_len],
                persona: &self.persona,
                now: self.clock.now(),
            };
            generate(turn.text(), &ctx)
        };

        let kind = match reply.action {
            Some(ActionKind::CreateFile) => MessageKind::File,
            Some(ActionKind::CreateTask) => MessageKind::Task,
            None => MessageKind::Text,
        };
        let speech = spoken_summary(&reply.response);
        let message = Message::agent(reply.response, self.timestamp())
            .with_kind(kind)
            .with_metadata(reply.metadata.clone());

        if let Some(action) = reply.action {
            info!(action = action.as_str(), "pending action opened");
            self.state.turn = TurnState::AwaitingFulfillment(PendingAction {
                kind: action,
                metadata: reply.metadata,
            });
        }

        TurnOutcome {
            kind: TurnKind::Reply,
            reply: self.push(message),
            speech: Some(speech),
            ledger_change: None,
        }
    }

    fn fulfill(&mut self, action: PendingAction, raw: &str) -> TurnOutcome {
        let content = raw.trim();

        if self.settings.cancel_phrases && is_cancel_phrase(content) {
            info!(action = action.kind.as_str(), "pending action cancelled");
            let message = Message::agent(CANCELLED_REPLY, self.timestamp());
            return TurnOutcome {
                kind: TurnKind::Cancelled,
                speech: Some(spoken_summary(CANCELLED_REPLY)),
                reply: self.push(message),
                ledger_change: None,
            };
        }

        if content.is_empty() && self.settings.empty_fulfillment == EmptyFulfillmentPolicy::Reprompt
        {
            warn!(action = action.kind.as_str(), "empty fulfillment content; asking again");
            let text = match action.kind {
                ActionKind::CreateFile => {
                    "I didn't get any content for the file. What would you like me to put in it?"
                }
                ActionKind::CreateTask => "I didn't catch the task. What should it say?",
            };
            let message = Message::agent(text, self.timestamp());
            self.state.turn = TurnState::AwaitingFulfillment(action);
            return TurnOutcome {
                kind: TurnKind::Reprompt,
                speech: Some(spoken_summary(text)),
                reply: self.push(message),
                ledger_change: None,
            };
        }

        let now = self.timestamp();
        let (text, kind, change) = match action.kind {
            ActionKind::CreateFile => {
                let file_type = action
                    .metadata
                    .get(META_FILE_TYPE)
                    .and_then(|v| v.as_str())
                    .and_then(FileType::parse)
                    .unwrap_or(self.settings.default_file_type);
                let file = CreatedFile::new(file_type, content, now);
                info!(file = %file.name, bytes = file.content.len(), "file created");
                let text = format!(
                    "I've created your {} file \"{}\" with your content. You can find it in \
                     the Files section. Would you like me to send it to someone or create \
                     another file?",
                    file_type.extension().to_uppercase(),
                    file.name
                );
                self.state.files.push(file.clone());
                (text, MessageKind::File, LedgerChange::FileAdded { file })
            }
            ActionKind::CreateTask => {
                let task = Task::new(content, now);
                info!(task_id = %task.id, "task created");
                let text = format!(
                    "I've added \"{content}\" to your tasks. You can view and manage your \
                     tasks in the Tasks section. Is there anything else you'd like me to help with?"
                );
                self.state.tasks.push(task.clone());
                (text, MessageKind::Task, LedgerChange::TaskAdded { task })
            }
        };

        let speech = first_sentence(&text);
        let message = Message::agent(text, now).with_kind(kind);
        TurnOutcome {
            kind: TurnKind::Fulfillment,
            reply: self.push(message),
            speech: Some(speech),
            ledger_change: Some(change),
        }
    }

    // ── Ledger operations from the renderer ─────────────────────────────

    /// Flip a task's status. Unknown ids change nothing.
    pub fn toggle_task(&mut self, id: &str) -> Option<TaskStatus> {
        let status = self.state.tasks.toggle(id);
        debug!(task_id = id, ?status, "toggle task");
        status
    }

    /// Remove a task. Unknown ids are a no-op returning `false`.
    pub fn delete_task(&mut self, id: &str) -> bool {
        self.state.tasks.remove(id)
    }

    /// Remove a file. Unknown ids are a no-op returning `false`.
    pub fn delete_file(&mut self, id: &str) -> bool {
        self.state.files.remove(id)
    }

    /// Hand out a file's content and confirm it in the transcript.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::FileNotFound`] for unknown ids.
    pub fn download_file(&mut self, id: &str) -> Result<FileDelivery> {
        let file = self
            .state
            .files
            .get(id)
            .cloned()
            .ok_or_else(|| AssistantError::FileNotFound(id.to_owned()))?;
        let confirmation = Message::agent(
            format!("File \"{}\" has been downloaded successfully.", file.name),
            self.timestamp(),
        );
        Ok(FileDelivery {
            speech: format!("File {} has been downloaded.", file.name),
            download: FileDownload {
                name: file.name,
                mime_type: "text/plain".to_owned(),
                content: file.content,
            },
            appended: vec![self.push(confirmation)],
        })
    }

    /// Simulate sending a file to a contact: summarise, then download it.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::InvalidRequest`] for a blank contact and
    /// [`AssistantError::FileNotFound`] for unknown ids.
    pub fn send_file(&mut self, id: &str, contact: &str) -> Result<FileDelivery> {
        let contact = contact.trim();
        if contact.is_empty() {
            return Err(AssistantError::InvalidRequest(
                "contact name cannot be empty".to_owned(),
            ));
        }
        let name = self
            .state
            .files
            .get(id)
            .map(|f| f.name.clone())
            .ok_or_else(|| AssistantError::FileNotFound(id.to_owned()))?;

        let summary = Message::agent(
            format!(
                "Task completed successfully.\n\n\
                 I've prepared the file \"{name}\" to be sent to {contact}. Share the \
                 downloaded copy with them directly.\n\n\
                 File: {name}\nRecipient: {contact}\nStatus: Ready to share"
            ),
            self.timestamp(),
        );
        let summary = self.push(summary);
        info!(file = %name, contact, "file prepared for sending");

        let mut delivery = self.download_file(id)?;
        delivery.appended.insert(0, summary);
        delivery.speech = format!("Task completed. File {name} is ready to send to {contact}.");
        Ok(delivery)
    }

    // ── Speech capture routing ──────────────────────────────────────────

    /// Route a recognition result. Returns the utterance to submit for
    /// non-empty final transcripts; interim transcripts are display-only.
    pub fn on_speech_result(&mut self, transcript: &str, is_final: bool) -> Option<String> {
        if !is_final {
            self.state.interim_transcript = transcript.to_owned();
            return None;
        }
        self.state.interim_transcript.clear();
        let trimmed = transcript.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    }

    /// Recognition failed: stop listening and apologise. The pending action is untouched.
    pub fn on_speech_error(&mut self, error: &str) -> Message {
        warn!(error, "speech recognition error");
        self.state.listening = false;
        self.state.interim_transcript.clear();
        let message = Message::agent(
            format!("I had trouble hearing you. {error} Please try again or type your message."),
            self.timestamp(),
        );
        self.push(message)
    }

    /// Recognition session ended.
    pub fn on_speech_end(&mut self) {
        self.state.listening = false;
        self.state.interim_transcript.clear();
    }

    pub fn set_listening(&mut self, listening: bool) {
        self.state.listening = listening;
        if !listening {
            self.state.interim_transcript.clear();
        }
    }

    pub fn set_speaking(&mut self, speaking: bool) {
        self.state.speaking = speaking;
    }

    pub fn set_voice_supported(&mut self, supported: bool) {
        self.state.voice_supported = supported;
    }
}

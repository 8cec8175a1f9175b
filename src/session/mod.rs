//! Single-consumer session actor around the conversation state machine.
//!
//! [`session_channel`] returns a cloneable [`SessionHandle`] and the
//! [`AssistantSession`] actor. The actor processes requests strictly in the
//! order received; a turn (including its thinking delay, side effects and
//! confirmation) completes before the next request is looked at. Capture
//! events and playback completions are queued behind the current turn.
//!
//! Playback runs as a spawned task with its own cancellation token, so the
//! user can keep typing while the assistant speaks. Starting a new listening
//! session cancels playback.

pub mod delay;
pub mod events;

pub use delay::{DelayKind, JitteredDelay, NoDelay, ThinkingDelay, delay_from_config};
pub use events::SessionEvent;

use crate::config::AssistantConfig;
use crate::conversation::clock::{Clock, SystemClock};
use crate::conversation::ledger::TaskStatus;
use crate::conversation::message::Message;
use crate::conversation::state::ConversationSnapshot;
use crate::conversation::{Conversation, FileDownload, LedgerChange, TurnKind};
use crate::error::{AssistantError, Result};
use crate::speech::{CaptureEvent, SpeechCapture, SpeechPlayback, VoiceOptions};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default request channel capacity.
pub const REQUEST_CAPACITY: usize = 64;

/// Default event broadcast capacity.
pub const EVENT_CAPACITY: usize = 256;

/// Summary of a processed utterance returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReport {
    pub kind: TurnKind,
    pub reply: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_change: Option<LedgerChange>,
}

enum SessionCommand {
    SendText(String),
    ToggleListening,
    Capture(CaptureEvent),
    StopSpeaking,
    ToggleTask(String),
    DeleteTask(String),
    DeleteFile(String),
    DownloadFile(String),
    SendFile { id: String, contact: String },
    Snapshot,
}

enum SessionResponse {
    Turn(Option<TurnReport>),
    Listening(bool),
    Ack,
    TaskStatus(Option<TaskStatus>),
    Removed(bool),
    Download(FileDownload),
    Snapshot(Box<ConversationSnapshot>),
}

struct SessionRequest {
    command: SessionCommand,
    response_tx: oneshot::Sender<Result<SessionResponse>>,
}

/// Cloneable client for a running [`AssistantSession`].
#[derive(Clone)]
pub struct SessionHandle {
    request_tx: mpsc::Sender<SessionRequest>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    async fn call(&self, command: SessionCommand) -> Result<SessionResponse> {
        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(SessionRequest {
                command,
                response_tx,
            })
            .await
            .map_err(|e| AssistantError::Channel(format!("session actor is gone: {e}")))?;

        response_rx
            .await
            .map_err(|e| AssistantError::Channel(format!("session response dropped: {e}")))?
    }

    /// Submit a typed utterance. Blank text is ignored and yields `None`.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<Option<TurnReport>> {
        match self.call(SessionCommand::SendText(text.into())).await? {
            SessionResponse::Turn(report) => Ok(report),
            _ => Err(unexpected("send_text")),
        }
    }

    /// Start listening, or stop if already listening. Returns the new state.
    pub async fn toggle_listening(&self) -> Result<bool> {
        match self.call(SessionCommand::ToggleListening).await? {
            SessionResponse::Listening(listening) => Ok(listening),
            _ => Err(unexpected("toggle_listening")),
        }
    }

    /// Relay a recognition event produced outside the process.
    ///
    /// Returns the turn when a final transcript produced one.
    pub async fn relay_capture(&self, event: CaptureEvent) -> Result<Option<TurnReport>> {
        match self.call(SessionCommand::Capture(event)).await? {
            SessionResponse::Turn(report) => Ok(report),
            _ => Err(unexpected("relay_capture")),
        }
    }

    pub async fn stop_speaking(&self) -> Result<()> {
        match self.call(SessionCommand::StopSpeaking).await? {
            SessionResponse::Ack => Ok(()),
            _ => Err(unexpected("stop_speaking")),
        }
    }

    pub async fn toggle_task(&self, id: impl Into<String>) -> Result<Option<TaskStatus>> {
        match self.call(SessionCommand::ToggleTask(id.into())).await? {
            SessionResponse::TaskStatus(status) => Ok(status),
            _ => Err(unexpected("toggle_task")),
        }
    }

    pub async fn delete_task(&self, id: impl Into<String>) -> Result<bool> {
        match self.call(SessionCommand::DeleteTask(id.into())).await? {
            SessionResponse::Removed(removed) => Ok(removed),
            _ => Err(unexpected("delete_task")),
        }
    }

    pub async fn delete_file(&self, id: impl Into<String>) -> Result<bool> {
        match self.call(SessionCommand::DeleteFile(id.into())).await? {
            SessionResponse::Removed(removed) => Ok(removed),
            _ => Err(unexpected("delete_file")),
        }
    }

    pub async fn download_file(&self, id: impl Into<String>) -> Result<FileDownload> {
        match self.call(SessionCommand::DownloadFile(id.into())).await? {
            SessionResponse::Download(download) => Ok(download),
            _ => Err(unexpected("download_file")),
        }
    }

    pub async fn send_file(
        &self,
        id: impl Into<String>,
        contact: impl Into<String>,
    ) -> Result<FileDownload> {
        let command = SessionCommand::SendFile {
            id: id.into(),
            contact: contact.into(),
        };
        match self.call(command).await? {
            SessionResponse::Download(download) => Ok(download),
            _ => Err(unexpected("send_file")),
        }
    }

    pub async fn snapshot(&self) -> Result<ConversationSnapshot> {
        match self.call(SessionCommand::Snapshot).await? {
            SessionResponse::Snapshot(snapshot) => Ok(*snapshot),
            _ => Err(unexpected("snapshot")),
        }
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }
}

fn unexpected(call: &str) -> AssistantError {
    AssistantError::Session(format!("unexpected response to {call}"))
}

struct ActivePlayback {
    generation: u64,
    cancel: CancellationToken,
}

/// The actor that owns the [`Conversation`].
pub struct AssistantSession<C: SpeechCapture, P: SpeechPlayback> {
    conversation: Conversation,
    capture: C,
    playback: Arc<P>,
    delay: Box<dyn ThinkingDelay>,
    voice: VoiceOptions,
    request_rx: mpsc::Receiver<SessionRequest>,
    event_tx: broadcast::Sender<SessionEvent>,
    capture_tx: mpsc::UnboundedSender<CaptureEvent>,
    capture_rx: mpsc::UnboundedReceiver<CaptureEvent>,
    capture_cancel: Option<CancellationToken>,
    playback_done_tx: mpsc::UnboundedSender<u64>,
    playback_done_rx: mpsc::UnboundedReceiver<u64>,
    active_playback: Option<ActivePlayback>,
    playback_generation: u64,
}

/// Builder-style inputs for [`session_channel`].
pub struct SessionParts<C, P> {
    pub capture: C,
    pub playback: P,
    pub delay: Box<dyn ThinkingDelay>,
    pub clock: Arc<dyn Clock>,
}

impl<C, P> SessionParts<C, P> {
    /// System clock and the delay described by `config.thinking`.
    pub fn new(config: &AssistantConfig, capture: C, playback: P) -> Self {
        Self {
            capture,
            playback,
            delay: delay_from_config(&config.thinking),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Box<dyn ThinkingDelay>) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Create a session handle and its actor. Spawn [`AssistantSession::run`].
#[must_use]
pub fn session_channel<C: SpeechCapture, P: SpeechPlayback>(
    config: &AssistantConfig,
    parts: SessionParts<C, P>,
    request_capacity: usize,
    event_capacity: usize,
) -> (SessionHandle, AssistantSession<C, P>) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    let (capture_tx, capture_rx) = mpsc::unbounded_channel();
    let (playback_done_tx, playback_done_rx) = mpsc::unbounded_channel();
    let mut conversation = Conversation::with_clock(config, parts.clock);
    conversation.set_voice_supported(parts.capture.is_supported());

    (
        SessionHandle {
            request_tx,
            event_tx: event_tx.clone(),
        },
        AssistantSession {
            conversation,
            capture: parts.capture,
            playback: Arc::new(parts.playback),
            delay: parts.delay,
            voice: config.voice.clone(),
            request_rx,
            event_tx,
            capture_tx,
            capture_rx,
            capture_cancel: None,
            playback_done_tx,
            playback_done_rx,
            active_playback: None,
            playback_generation: 0,
        },
    )
}

impl<C: SpeechCapture, P: SpeechPlayback> AssistantSession<C, P> {
    /// Greet, then serve requests until every [`SessionHandle`] is dropped.
    pub async fn run(mut self) {
        let (welcome, speech) = self.conversation.startup();
        self.emit(SessionEvent::MessageAppended { message: welcome });
        self.speak(speech);
        info!("assistant session started");

        loop {
            tokio::select! {
                request = self.request_rx.recv() => {
                    let Some(request) = request else { break };
                    let response = self.handle(request.command).await;
                    let _ = request.response_tx.send(response);
                }
                Some(event) = self.capture_rx.recv() => {
                    self.handle_capture(event).await;
                }
                Some(generation) = self.playback_done_rx.recv() => {
                    self.playback_finished(generation);
                }
            }
        }

        self.stop_speaking();
        if let Some(cancel) = self.capture_cancel.take() {
            cancel.cancel();
            self.capture.stop();
        }
        info!("assistant session stopped");
    }

    async fn handle(&mut self, command: SessionCommand) -> Result<SessionResponse> {
        match command {
            SessionCommand::SendText(text) => {
                let text = text.trim().to_owned();
                // Blank input only means something to an open pending action.
                if text.is_empty() && self.conversation.pending_action().is_none() {
                    debug!("ignoring blank input");
                    return Ok(SessionResponse::Turn(None));
                }
                Ok(SessionResponse::Turn(Some(self.process_utterance(&text).await)))
            }
            SessionCommand::ToggleListening => {
                Ok(SessionResponse::Listening(self.toggle_listening()))
            }
            SessionCommand::Capture(event) => {
                Ok(SessionResponse::Turn(self.handle_capture(event).await))
            }
            SessionCommand::StopSpeaking => {
                self.stop_speaking();
                Ok(SessionResponse::Ack)
            }
            SessionCommand::ToggleTask(id) => {
                let status = self.conversation.toggle_task(&id);
                if status.is_some() {
                    self.emit_tasks();
                }
                Ok(SessionResponse::TaskStatus(status))
            }
            SessionCommand::DeleteTask(id) => {
                let removed = self.conversation.delete_task(&id);
                if removed {
                    self.emit_tasks();
                }
                Ok(SessionResponse::Removed(removed))
            }
            SessionCommand::DeleteFile(id) => {
                let removed = self.conversation.delete_file(&id);
                if removed {
                    self.emit_files();
                }
                Ok(SessionResponse::Removed(removed))
            }
            SessionCommand::DownloadFile(id) => {
                let delivery = self.conversation.download_file(&id)?;
                for message in delivery.appended {
                    self.emit(SessionEvent::MessageAppended { message });
                }
                self.speak(delivery.speech);
                Ok(SessionResponse::Download(delivery.download))
            }
            SessionCommand::SendFile { id, contact } => {
                let delivery = self.conversation.send_file(&id, &contact)?;
                for message in delivery.appended {
                    self.emit(SessionEvent::MessageAppended { message });
                }
                self.speak(delivery.speech);
                Ok(SessionResponse::Download(delivery.download))
            }
            SessionCommand::Snapshot => Ok(SessionResponse::Snapshot(Box::new(
                self.conversation.snapshot(),
            ))),
        }
    }

    async fn process_utterance(&mut self, text: &str) -> TurnReport {
        let pending_before = self.conversation.pending_action().cloned();
        let turn = self.conversation.record_user(text);
        self.emit(SessionEvent::MessageAppended {
            message: turn.message.clone(),
        });
        self.emit(SessionEvent::TypingChanged { typing: true });

        let kind = if pending_before.is_some() {
            DelayKind::Fulfillment
        } else {
            DelayKind::Reply
        };
        let wait = self.delay.delay_for(kind);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let outcome = self.conversation.respond(&turn);
        info!(kind = ?outcome.kind, "turn processed");
        self.emit(SessionEvent::MessageAppended {
            message: outcome.reply.clone(),
        });
        self.emit(SessionEvent::TypingChanged { typing: false });

        match &outcome.ledger_change {
            Some(LedgerChange::TaskAdded { .. }) => self.emit_tasks(),
            Some(LedgerChange::FileAdded { .. }) => self.emit_files(),
            None => {}
        }
        let pending_after = self.conversation.pending_action().cloned();
        if pending_after != pending_before {
            self.emit(SessionEvent::PendingActionChanged {
                pending: pending_after,
            });
        }
        if let Some(speech) = outcome.speech {
            self.speak(speech);
        }

        TurnReport {
            kind: outcome.kind,
            reply: outcome.reply,
            ledger_change: outcome.ledger_change,
        }
    }

    async fn handle_capture(&mut self, event: CaptureEvent) -> Option<TurnReport> {
        match event {
            CaptureEvent::Result {
                transcript,
                is_final,
            } => {
                let utterance = self.conversation.on_speech_result(&transcript, is_final);
                self.emit(SessionEvent::InterimTranscript {
                    transcript: self.conversation.state().interim_transcript().to_owned(),
                });
                match utterance {
                    Some(text) => Some(self.process_utterance(&text).await),
                    None => None,
                }
            }
            CaptureEvent::Error { message } => {
                self.end_capture();
                self.capture.stop();
                let apology = self.conversation.on_speech_error(&message);
                self.emit(SessionEvent::ListeningChanged { listening: false });
                self.emit(SessionEvent::MessageAppended { message: apology });
                None
            }
            CaptureEvent::End => {
                self.end_capture();
                self.capture.stop();
                self.conversation.on_speech_end();
                self.emit(SessionEvent::ListeningChanged { listening: false });
                None
            }
        }
    }

    fn toggle_listening(&mut self) -> bool {
        if self.conversation.state().is_listening() {
            self.end_capture();
            self.capture.stop();
            self.conversation.set_listening(false);
            self.emit(SessionEvent::ListeningChanged { listening: false });
            return false;
        }

        self.stop_speaking();
        let cancel = CancellationToken::new();
        // Listening is marked first so events the provider emits synchronously
        // during `start` find the session listening.
        self.conversation.set_listening(true);
        match self.capture.start(self.capture_tx.clone(), cancel.clone()) {
            Ok(()) => {
                self.capture_cancel = Some(cancel);
                self.emit(SessionEvent::ListeningChanged { listening: true });
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to start speech capture");
                let apology = self.conversation.on_speech_error(&e.to_string());
                self.emit(SessionEvent::MessageAppended { message: apology });
                false
            }
        }
    }

    fn end_capture(&mut self) {
        if let Some(cancel) = self.capture_cancel.take() {
            cancel.cancel();
        }
    }

    fn speak(&mut self, text: String) {
        self.stop_speaking();
        if text.trim().is_empty() {
            return;
        }

        self.playback_generation += 1;
        let generation = self.playback_generation;
        let cancel = CancellationToken::new();
        self.active_playback = Some(ActivePlayback {
            generation,
            cancel: cancel.clone(),
        });
        self.conversation.set_speaking(true);
        self.emit(SessionEvent::SpeakingChanged { speaking: true });
        self.emit(SessionEvent::SpeechRequested {
            text: text.clone(),
            voice: self.voice.clone(),
        });

        let playback = Arc::clone(&self.playback);
        let voice = self.voice.clone();
        let done_tx = self.playback_done_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = playback.speak(&text, &voice, cancel).await {
                warn!(error = %e, "speech playback failed");
            }
            let _ = done_tx.send(generation);
        });
    }

    fn stop_speaking(&mut self) {
        if let Some(active) = self.active_playback.take() {
            active.cancel.cancel();
            self.conversation.set_speaking(false);
            self.emit(SessionEvent::SpeakingChanged { speaking: false });
        }
    }

    fn playback_finished(&mut self, generation: u64) {
        let current = self.active_playback.as_ref().map(|a| a.generation);
        if current != Some(generation) {
            debug!(generation, "ignoring stale playback completion");
            return;
        }
        self.active_playback = None;
        self.conversation.set_speaking(false);
        self.emit(SessionEvent::SpeakingChanged { speaking: false });
    }

    fn emit_tasks(&self) {
        self.emit(SessionEvent::TasksChanged {
            tasks: self.conversation.state().tasks().iter().cloned().collect(),
        });
    }

    fn emit_files(&self) {
        self.emit(SessionEvent::FilesChanged {
            files: self.conversation.state().files().iter().cloned().collect(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

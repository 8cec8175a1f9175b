//! Speech capture and playback collaborator interfaces.
//!
//! The core never talks to audio hardware or a browser speech API directly.
//! Hosts plug in a [`SpeechCapture`] that pushes [`CaptureEvent`]s into a
//! channel and a [`SpeechPlayback`] that speaks text until finished or
//! cancelled. Both are driven by the session actor, which owns the
//! cancellation tokens; a provider must never assume it is still wanted
//! once its token fires.

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Voice parameters for playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceOptions {
    /// Speaking rate multiplier (1.0 = normal).
    pub rate: f32,
    /// Pitch multiplier (1.0 = normal).
    pub pitch: f32,
    /// Volume in `0.0..=1.0`.
    pub volume: f32,
    /// BCP-47 voice language.
    pub language: String,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            language: "en-US".to_owned(),
        }
    }
}

/// Output of a capture provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaptureEvent {
    /// Incremental recognition result. Only `is_final` results become utterances.
    Result { transcript: String, is_final: bool },
    /// Recognition failed or was denied.
    Error { message: String },
    /// The recognition session ended.
    End,
}

/// Speech-to-text provider.
pub trait SpeechCapture: Send + 'static {
    /// Begin a listening session, delivering events to `events` until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unavailable.
    fn start(
        &mut self,
        events: mpsc::UnboundedSender<CaptureEvent>,
        cancel: CancellationToken,
    ) -> Result<()>;

    /// End the listening session.
    fn stop(&mut self);

    /// Whether this provider can capture at all.
    fn is_supported(&self) -> bool {
        true
    }
}

/// Text-to-speech provider.
#[async_trait]
pub trait SpeechPlayback: Send + Sync + 'static {
    /// Speak `text`, resolving when playback finishes or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if playback could not start.
    async fn speak(&self, text: &str, voice: &VoiceOptions, cancel: CancellationToken)
    -> Result<()>;
}

/// Capture provider for hosts that run recognition themselves and relay
/// results as commands. Starting and stopping only track the session.
#[derive(Debug, Default)]
pub struct RelayedCapture {
    active: bool,
}

impl RelayedCapture {
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl SpeechCapture for RelayedCapture {
    fn start(
        &mut self,
        _events: mpsc::UnboundedSender<CaptureEvent>,
        _cancel: CancellationToken,
    ) -> Result<()> {
        info!("listening session started (host-relayed recognition)");
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        info!("listening session stopped");
        self.active = false;
    }
}

/// Capture provider that reports itself unsupported; every start fails.
#[derive(Debug, Default)]
pub struct UnsupportedCapture;

impl SpeechCapture for UnsupportedCapture {
    fn start(
        &mut self,
        _events: mpsc::UnboundedSender<CaptureEvent>,
        _cancel: CancellationToken,
    ) -> Result<()> {
        Err(AssistantError::Speech(
            "Speech recognition is not supported here.".to_owned(),
        ))
    }

    fn stop(&mut self) {}

    fn is_supported(&self) -> bool {
        false
    }
}

/// Capture provider that replays a fixed list of events on every start.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCapture {
    script: Vec<CaptureEvent>,
}

impl ScriptedCapture {
    pub fn new(script: Vec<CaptureEvent>) -> Self {
        Self { script }
    }
}

impl SpeechCapture for ScriptedCapture {
    fn start(
        &mut self,
        events: mpsc::UnboundedSender<CaptureEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        for event in &self.script {
            if cancel.is_cancelled() {
                break;
            }
            events
                .send(event.clone())
                .map_err(|e| AssistantError::Channel(format!("capture sink closed: {e}")))?;
        }
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Playback that finishes immediately without producing audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayback;

#[async_trait]
impl SpeechPlayback for SilentPlayback {
    async fn speak(
        &self,
        text: &str,
        _voice: &VoiceOptions,
        _cancel: CancellationToken,
    ) -> Result<()> {
        debug!(chars = text.len(), "silent playback");
        Ok(())
    }
}

/// Playback that takes as long as reading the text aloud would, without audio.
///
/// Useful for exercising barge-in: the future resolves early when cancelled.
#[derive(Debug, Clone, Copy)]
pub struct PacedPlayback {
    words_per_minute: u32,
}

impl PacedPlayback {
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
        }
    }

    /// Estimated speaking time of `text` at `rate`.
    pub fn duration_for(&self, text: &str, rate: f32) -> Duration {
        let words = text.split_whitespace().count() as f64;
        let rate = if rate > 0.0 { f64::from(rate) } else { 1.0 };
        Duration::from_secs_f64(words * 60.0 / (f64::from(self.words_per_minute) * rate))
    }
}

impl Default for PacedPlayback {
    fn default() -> Self {
        Self::new(170)
    }
}

#[async_trait]
impl SpeechPlayback for PacedPlayback {
    async fn speak(
        &self,
        text: &str,
        voice: &VoiceOptions,
        cancel: CancellationToken,
    ) -> Result<()> {
        let duration = self.duration_for(text, voice.rate);
        tokio::select! {
            _ = cancel.cancelled() => debug!("paced playback interrupted"),
            _ = tokio::time::sleep(duration) => debug!(?duration, "paced playback finished"),
        }
        Ok(())
    }
}

use async_trait::async_trait;
use parlor::config::AssistantConfig;
use parlor::session::{
    DelayKind, NoDelay, SessionEvent, SessionHandle, SessionParts, ThinkingDelay, session_channel,
};
use parlor::speech::{
    CaptureEvent, ScriptedCapture, SpeechCapture, SpeechPlayback, UnsupportedCapture, VoiceOptions,
};
use parlor::{AssistantError, TurnKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct RecordingPlayback {
    spoken: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SpeechPlayback for RecordingPlayback {
    async fn speak(
        &self,
        text: &str,
        _voice: &VoiceOptions,
        _cancel: CancellationToken,
    ) -> parlor::Result<()> {
        self.spoken
            .lock()
            .expect("lock spoken records")
            .push(text.to_owned());
        Ok(())
    }
}

/// Records which delay kinds were requested and never actually waits.
#[derive(Clone, Default)]
struct RecordingDelay {
    kinds: Arc<Mutex<Vec<DelayKind>>>,
}

impl ThinkingDelay for RecordingDelay {
    fn delay_for(&self, kind: DelayKind) -> Duration {
        self.kinds.lock().expect("lock delay records").push(kind);
        Duration::ZERO
    }
}

fn start<C: SpeechCapture>(
    capture: C,
    playback: RecordingPlayback,
    delay: Box<dyn ThinkingDelay>,
) -> (SessionHandle, broadcast::Receiver<SessionEvent>) {
    let config = AssistantConfig::default();
    let parts = SessionParts::new(&config, capture, playback).with_delay(delay);
    let (handle, session) = session_channel(&config, parts, 16, 256);
    let events = handle.subscribe_events();
    tokio::spawn(session.run());
    (handle, events)
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

async fn settle(handle: &SessionHandle) {
    for _ in 0..10 {
        handle.snapshot().await.expect("snapshot");
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn replies_and_confirmations_are_spoken_in_order() {
    let playback = RecordingPlayback::default();
    let (handle, _events) = start(UnsupportedCapture, playback.clone(), Box::new(NoDelay));

    handle.send_text("make a document").await.expect("ask");
    handle
        .send_text("notes.v2 are ready")
        .await
        .expect("fulfil");
    settle(&handle).await;

    let spoken = playback.spoken.lock().expect("lock spoken records").clone();
    assert_eq!(spoken.len(), 3);
    assert!(spoken[0].starts_with("Welcome."));
    assert!(!spoken[1].contains("**"));
    assert!(spoken[2].starts_with("I've created your TXT file \"document_"));
    assert!(spoken[2].ends_with(".txt\" with your content."));
}

#[tokio::test]
async fn fulfillment_turns_use_the_fulfillment_delay() {
    let delay = RecordingDelay::default();
    let (handle, _events) = start(
        UnsupportedCapture,
        RecordingPlayback::default(),
        Box::new(delay.clone()),
    );

    handle.send_text("hello").await.expect("greet");
    handle.send_text("add a task").await.expect("ask");
    handle.send_text("pay rent").await.expect("fulfil");

    let kinds = delay.kinds.lock().expect("lock delay records").clone();
    assert_eq!(
        kinds,
        vec![DelayKind::Reply, DelayKind::Reply, DelayKind::Fulfillment]
    );
}

#[tokio::test]
async fn pending_action_changes_are_broadcast() {
    let (handle, mut events) = start(
        UnsupportedCapture,
        RecordingPlayback::default(),
        Box::new(NoDelay),
    );
    handle.snapshot().await.expect("snapshot");
    drain(&mut events);

    handle.send_text("remind me to stretch").await.expect("ask");
    handle.send_text("cancel").await.expect("cancel");

    let pending: Vec<bool> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::PendingActionChanged { pending } => Some(pending.is_some()),
            _ => None,
        })
        .collect();
    assert_eq!(pending, vec![true, false]);

    let report = handle.send_text("hello").await.expect("greet").expect("turn");
    assert_eq!(report.kind, TurnKind::Reply);
    assert!(handle.snapshot().await.expect("snapshot").tasks.is_empty());
}

#[tokio::test]
async fn capture_error_apologises_and_keeps_pending_action() {
    let capture = ScriptedCapture::new(vec![CaptureEvent::Error {
        message: "Microphone access was denied.".to_owned(),
    }]);
    let (handle, _events) = start(capture, RecordingPlayback::default(), Box::new(NoDelay));

    handle.send_text("create a file").await.expect("ask");
    assert!(handle.toggle_listening().await.expect("listen"));
    settle(&handle).await;

    let snapshot = handle.snapshot().await.expect("snapshot");
    assert!(!snapshot.listening);
    assert!(snapshot.pending_action.is_some());
    let last = snapshot.messages.last().expect("apology");
    assert_eq!(
        last.content,
        "I had trouble hearing you. Microphone access was denied. Please try again or type your message."
    );
}

#[tokio::test]
async fn send_file_requires_a_contact() {
    let (handle, _events) = start(
        UnsupportedCapture,
        RecordingPlayback::default(),
        Box::new(NoDelay),
    );
    handle.send_text("write a report").await.expect("ask");
    handle.send_text("Q3 went well").await.expect("fulfil");
    let file_id = handle.snapshot().await.expect("snapshot").files[0].id.clone();

    let err = handle.send_file(&file_id, "").await.expect_err("blank contact");
    assert!(matches!(err, AssistantError::InvalidRequest(_)));

    let download = handle.send_file(&file_id, "Ana").await.expect("send");
    assert_eq!(download.mime_type, "text/plain");
    let messages = handle.snapshot().await.expect("snapshot").messages;
    let tail: Vec<_> = messages.iter().rev().take(2).map(|m| m.content.as_str()).collect();
    assert!(tail[1].starts_with("Task completed successfully."));
    assert!(tail[0].ends_with("has been downloaded successfully."));
}

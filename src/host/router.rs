//! Routes host command envelopes onto a running assistant session.

use crate::error::{AssistantError, Result};
use crate::host::contract::{
    CommandEnvelope, CommandName, EVENT_VERSION, EventEnvelope, ResponseEnvelope,
};
use crate::session::{SessionEvent, SessionHandle};
use crate::speech::CaptureEvent;
use serde::Serialize;

/// Dispatches [`CommandEnvelope`]s to a [`SessionHandle`].
#[derive(Clone)]
pub struct HostRouter {
    session: SessionHandle,
}

impl HostRouter {
    #[must_use]
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }

    /// Validate and route one envelope. Routing failures become error
    /// responses carrying the request id.
    pub async fn dispatch(&self, envelope: &CommandEnvelope) -> ResponseEnvelope {
        if let Err(e) = envelope.validate() {
            tracing::warn!(error = %e, "rejecting invalid command envelope");
            return ResponseEnvelope::error(envelope.request_id.clone(), e.to_string());
        }
        match self.route(envelope).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(command = envelope.command.as_str(), error = %e, "command failed");
                ResponseEnvelope::error(envelope.request_id.clone(), e.to_string())
            }
        }
    }

    /// Route a command envelope to the appropriate session call.
    pub async fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let payload = &envelope.payload;
        let body = match envelope.command {
            CommandName::HostPing => serde_json::json!({"pong": true}),
            CommandName::HostVersion => serde_json::json!({
                "contract_version": EVENT_VERSION,
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }),
            CommandName::RuntimeStop => serde_json::json!({"stopping": true}),
            CommandName::ConversationSend => {
                let text = require_str(envelope, "text")?;
                let turn = self.session.send_text(text).await?;
                serde_json::json!({ "turn": to_value(&turn)? })
            }
            CommandName::ConversationSnapshot => to_value(&self.session.snapshot().await?)?,
            CommandName::SpeechListenToggle => {
                let listening = self.session.toggle_listening().await?;
                serde_json::json!({ "listening": listening })
            }
            CommandName::SpeechResult => {
                let transcript = require_str(envelope, "transcript")?;
                let is_final = payload
                    .get("is_final")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(true);
                let turn = self
                    .session
                    .relay_capture(CaptureEvent::Result {
                        transcript: transcript.to_owned(),
                        is_final,
                    })
                    .await?;
                serde_json::json!({ "turn": to_value(&turn)? })
            }
            CommandName::SpeechError => {
                let message = payload
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                self.session
                    .relay_capture(CaptureEvent::Error { message })
                    .await?;
                serde_json::json!({"accepted": true})
            }
            CommandName::SpeechEnd => {
                self.session.relay_capture(CaptureEvent::End).await?;
                serde_json::json!({"accepted": true})
            }
            CommandName::SpeechStopSpeaking => {
                self.session.stop_speaking().await?;
                serde_json::json!({"stopped": true})
            }
            CommandName::TaskToggle => {
                let status = self.session.toggle_task(require_str(envelope, "id")?).await?;
                serde_json::json!({ "status": to_value(&status)? })
            }
            CommandName::TaskDelete => {
                let removed = self.session.delete_task(require_str(envelope, "id")?).await?;
                serde_json::json!({ "removed": removed })
            }
            CommandName::FileDelete => {
                let removed = self.session.delete_file(require_str(envelope, "id")?).await?;
                serde_json::json!({ "removed": removed })
            }
            CommandName::FileDownload => {
                to_value(&self.session.download_file(require_str(envelope, "id")?).await?)?
            }
            CommandName::FileSend => {
                let id = require_str(envelope, "id")?;
                let contact = require_str(envelope, "contact")?;
                to_value(&self.session.send_file(id, contact).await?)?
            }
        };
        Ok(ResponseEnvelope::ok(envelope.request_id.clone(), body))
    }
}

/// Wrap a session event for the host event stream.
#[must_use]
pub fn event_envelope(event: &SessionEvent) -> EventEnvelope {
    EventEnvelope::new(
        uuid::Uuid::new_v4().to_string(),
        event.name(),
        event.payload(),
    )
}

fn require_str<'a>(envelope: &'a CommandEnvelope, field: &str) -> Result<&'a str> {
    envelope
        .payload
        .get(field)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            AssistantError::InvalidRequest(format!(
                "{} requires payload.{field}",
                envelope.command.as_str()
            ))
        })
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| AssistantError::Contract(format!("failed to serialize payload: {e}")))
}

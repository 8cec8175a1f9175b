//! Stdin/stdout JSON bridge for the host command protocol.
//!
//! Reads newline-delimited JSON [`CommandEnvelope`] messages from stdin,
//! dispatches them through a [`HostRouter`], and writes [`ResponseEnvelope`]
//! and [`EventEnvelope`](crate::host::contract::EventEnvelope) messages as
//! newline-delimited JSON to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::host::contract::{CommandEnvelope, CommandName, ResponseEnvelope};
use crate::host::router::{HostRouter, event_envelope};
use crate::session::{EVENT_CAPACITY, REQUEST_CAPACITY, SessionParts, session_channel};
use crate::speech::{SpeechCapture, SpeechPlayback};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;

/// Run the stdin/stdout JSON bridge until stdin closes or a `runtime.stop`
/// command is received.
pub async fn run_stdio_bridge<C: SpeechCapture, P: SpeechPlayback>(
    config: &AssistantConfig,
    parts: SessionParts<C, P>,
) -> Result<()> {
    serve_lines(
        config,
        parts,
        BufReader::new(tokio::io::stdin()),
        BufWriter::new(tokio::io::stdout()),
    )
    .await
}

/// Serve the line protocol over any reader/writer pair.
///
/// Three tasks operate concurrently:
///
/// 1. **Reader** (current task): parses each line, dispatches it, and
///    writes the response.
/// 2. **Event forwarder**: writes every session event as an event line.
/// 3. **Session**: the assistant actor.
///
/// Dropping the router when the reader finishes stops the session, which
/// closes the event stream and ends the forwarder after it has flushed
/// every event already emitted.
pub async fn serve_lines<C, P, R, W>(
    config: &AssistantConfig,
    parts: SessionParts<C, P>,
    reader: R,
    writer: W,
) -> Result<()>
where
    C: SpeechCapture,
    P: SpeechPlayback,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (handle, session) = session_channel(config, parts, REQUEST_CAPACITY, EVENT_CAPACITY);
    let writer = Arc::new(Mutex::new(writer));

    // Subscribe before the actor starts so the welcome is not missed.
    let mut event_rx = handle.subscribe_events();
    let session_task = tokio::spawn(session.run());

    let event_writer = Arc::clone(&writer);
    let event_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => match serde_json::to_string(&event_envelope(&event)) {
                    Ok(json) => {
                        let mut w = event_writer.lock().await;
                        if let Err(e) = write_line(&mut *w, &json).await {
                            tracing::warn!(
                                error = %e,
                                "failed to write event envelope; stopping event forwarder"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize event envelope; skipping");
                    }
                },
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(RecvError::Closed) => {
                    tracing::info!("event stream closed; stopping event forwarder");
                    break;
                }
            }
        }
    });

    let reader_result = run_reader(HostRouter::new(handle), reader, Arc::clone(&writer)).await;

    let _ = session_task.await;
    let _ = event_task.await;

    reader_result
}

async fn run_reader<R, W>(router: HostRouter, mut reader: R, writer: Arc<Mutex<W>>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| AssistantError::Channel(format!("failed to read command line: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("input closed (EOF); shutting down bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (response, is_stop) = match serde_json::from_str::<CommandEnvelope>(trimmed) {
            Ok(envelope) => {
                let response = router.dispatch(&envelope).await;
                let is_stop = envelope.command == CommandName::RuntimeStop && response.ok;
                (response, is_stop)
            }
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %trimmed, "failed to parse command envelope");
                (
                    ResponseEnvelope::error(
                        "parse-error",
                        format!("failed to parse command envelope: {e}"),
                    ),
                    false,
                )
            }
        };

        let json = serde_json::to_string(&response).map_err(|e| {
            AssistantError::Contract(format!("failed to serialize response envelope: {e}"))
        })?;
        {
            let mut w = writer.lock().await;
            write_line(&mut *w, &json).await?;
        }

        if is_stop {
            tracing::info!("runtime.stop received; shutting down bridge");
            break;
        }
    }

    Ok(())
}

/// Write a single JSON line and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| AssistantError::Channel(format!("failed to write line: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| AssistantError::Channel(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| AssistantError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::host::contract::{EVENT_VERSION, EventEnvelope};
    use crate::session::NoDelay;
    use crate::speech::{SilentPlayback, UnsupportedCapture};

    async fn serve(input: &str) -> Vec<serde_json::Value> {
        let config = AssistantConfig::default();
        let parts = SessionParts::new(&config, UnsupportedCapture, SilentPlayback)
            .with_delay(Box::new(NoDelay));
        let (client, server) = tokio::io::duplex(64 * 1024);
        serve_lines(&config, parts, input.as_bytes(), server)
            .await
            .unwrap();

        let mut out = String::new();
        let mut client = BufReader::new(client);
        while client.read_line(&mut out).await.unwrap() > 0 {}
        out.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn bad_json_yields_parse_error_response() {
        let lines = serve("not json\n").await;
        let resp = lines
            .iter()
            .find(|v| v.get("request_id").is_some())
            .unwrap();
        assert_eq!(resp["request_id"], "parse-error");
        assert_eq!(resp["ok"], false);
        assert_eq!(resp["v"], EVENT_VERSION);
    }

    #[tokio::test]
    async fn stop_ends_bridge_and_skips_later_lines() {
        let input = concat!(
            r#"{"v":1,"request_id":"a","command":"runtime.stop"}"#,
            "\n",
            r#"{"v":1,"request_id":"b","command":"host.ping"}"#,
            "\n",
        );
        let lines = serve(input).await;
        let ids: Vec<_> = lines
            .iter()
            .filter_map(|v| v.get("request_id").and_then(|id| id.as_str()))
            .collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn welcome_is_streamed_as_event() {
        let lines = serve("").await;
        let first: EventEnvelope = serde_json::from_value(lines[0].clone()).unwrap();
        assert_eq!(first.event, "message.appended");
        assert_eq!(first.payload["message"]["role"], "agent");
    }
}

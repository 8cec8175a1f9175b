//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! Reads `CommandEnvelope` messages as newline-delimited JSON from stdin,
//! routes them to the assistant session, and writes `ResponseEnvelope` and
//! `EventEnvelope` messages to stdout. Speech recognition and synthesis are
//! performed by the host: recognition results arrive as `speech.result`
//! commands and `speech.requested` events carry the text to speak.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use clap::Parser;
use parlor::AssistantConfig;
use parlor::host::stdio::run_stdio_bridge;
use parlor::session::{NoDelay, SessionParts};
use parlor::speech::{RelayedCapture, SilentPlayback};
use std::path::PathBuf;

/// Parlor host bridge: JSON lines on stdin/stdout.
#[derive(Parser)]
#[command(name = "parlor-host", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = parlor::config::CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Reply immediately instead of simulating thinking time.
    #[arg(long)]
    instant: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("parlor=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(ref path) => AssistantConfig::from_file(path)?,
        None => AssistantConfig::load_or_default()?,
    };

    tracing::info!("parlor-host starting");

    let mut parts = SessionParts::new(&config, RelayedCapture::default(), SilentPlayback);
    if cli.instant {
        parts = parts.with_delay(Box::new(NoDelay));
    }

    run_stdio_bridge(&config, parts).await.map_err(|e| {
        tracing::error!(error = %e, "parlor-host exited with error");
        anyhow::anyhow!("parlor-host failed: {e}")
    })?;

    tracing::info!("parlor-host shut down cleanly");
    Ok(())
}

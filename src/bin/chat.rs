//! Terminal chat for the assistant.
//!
//! Lines typed on stdin are sent as utterances. Lines starting with `/` are
//! commands for the task and file side panels; `/help` lists them.

use clap::Parser;
use parlor::conversation::message::{Message, Role};
use parlor::session::{NoDelay, SessionEvent, SessionHandle, SessionParts, session_channel};
use parlor::speech::{PacedPlayback, UnsupportedCapture};
use parlor::{AssistantConfig, ConversationSnapshot};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Parlor: a rule-based personal assistant in your terminal.
#[derive(Parser)]
#[command(name = "parlor-chat", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = parlor::config::CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Reply immediately instead of simulating thinking time.
    #[arg(long)]
    instant: bool,

    /// Directory that `/download` writes files into.
    #[arg(long, default_value = ".")]
    download_dir: PathBuf,
}

const HELP: &str = "\
Commands:
  /tasks                 list tasks
  /files                 list created files
  /toggle <task-id>      flip a task between pending and completed
  /rm-task <task-id>     delete a task
  /rm-file <file-id>     delete a file
  /download <file-id>    save a file into the download directory
  /send <file-id> <who>  send a file to a contact
  /stop                  stop speaking
  /quit                  leave";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parlor=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(ref path) => AssistantConfig::from_file(path)?,
        None => AssistantConfig::load_or_default()?,
    };

    let mut parts = SessionParts::new(&config, UnsupportedCapture, PacedPlayback::default());
    if cli.instant {
        parts = parts.with_delay(Box::new(NoDelay));
    }
    let (handle, session) = session_channel(
        &config,
        parts,
        parlor::session::REQUEST_CAPACITY,
        parlor::session::EVENT_CAPACITY,
    );
    let events = handle.subscribe_events();
    let session_task = tokio::spawn(session.run());
    let printer = tokio::spawn(print_events(events));

    println!("Parlor v{}  (type /help for commands)\n", env!("CARGO_PKG_VERSION"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down...");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line == "/quit" {
                    break;
                }
                if let Err(e) = handle_line(&handle, line, &cli.download_dir).await {
                    eprintln!("! {e}");
                }
            }
        }
    }

    drop(handle);
    let _ = session_task.await;
    let _ = printer.await;
    Ok(())
}

async fn handle_line(
    handle: &SessionHandle,
    line: &str,
    download_dir: &std::path::Path,
) -> anyhow::Result<()> {
    let Some(command) = line.strip_prefix('/') else {
        handle.send_text(line).await?;
        return Ok(());
    };

    let mut words = command.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let arg = words.next();
    let rest: Vec<&str> = words.collect();

    match (verb, arg) {
        ("help", _) => println!("{HELP}"),
        ("tasks", _) => print_tasks(&handle.snapshot().await?),
        ("files", _) => print_files(&handle.snapshot().await?),
        ("toggle", Some(id)) => match handle.toggle_task(id).await? {
            Some(status) => println!("  task {id} is now {status:?}"),
            None => println!("  no task {id}"),
        },
        ("rm-task", Some(id)) => report_removed("task", id, handle.delete_task(id).await?),
        ("rm-file", Some(id)) => report_removed("file", id, handle.delete_file(id).await?),
        ("download", Some(id)) => {
            let download = handle.download_file(id).await?;
            let path = download_dir.join(&download.name);
            tokio::fs::write(&path, download.content.as_bytes()).await?;
            println!("  saved {}", path.display());
        }
        ("send", Some(id)) => {
            let download = handle.send_file(id, rest.join(" ")).await?;
            println!("  sent {}", download.name);
        }
        ("stop", _) => handle.stop_speaking().await?,
        _ => println!("{HELP}"),
    }
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::MessageAppended { message }) => print_message(&message),
            Ok(SessionEvent::TypingChanged { typing: true }) => println!("  ..."),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_message(message: &Message) {
    match message.role {
        Role::Agent => {
            for line in message.content.replace("**", "").lines() {
                println!("parlor> {line}");
            }
            println!();
        }
        Role::User => {}
    }
}

fn print_tasks(snapshot: &ConversationSnapshot) {
    if snapshot.tasks.is_empty() {
        println!("  no tasks yet");
    }
    for task in &snapshot.tasks {
        println!("  [{:?}] {}  ({})", task.status, task.title, task.id);
    }
}

fn print_files(snapshot: &ConversationSnapshot) {
    if snapshot.files.is_empty() {
        println!("  no files yet");
    }
    for file in &snapshot.files {
        println!("  {}  {} bytes  ({})", file.name, file.content.len(), file.id);
    }
}

fn report_removed(kind: &str, id: &str, removed: bool) {
    if removed {
        println!("  deleted {kind} {id}");
    } else {
        println!("  no {kind} {id}");
    }
}

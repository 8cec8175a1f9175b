//! Error types for the assistant core.

/// Top-level error type for the conversational assistant.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Speech capture or playback provider error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// Session actor error (actor gone, reply dropped).
    #[error("session error: {0}")]
    Session(String),

    /// No created file with the given id.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A request from the rendering layer carried invalid arguments.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Host envelope failed contract validation.
    #[error("contract error: {0}")]
    Contract(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;

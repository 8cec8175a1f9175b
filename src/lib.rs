//! Parlor: a rule-based conversational assistant core.
//!
//! The crate turns user utterances (typed or recognised from speech) into
//! assistant replies and side effects:
//!
//! - **Intent matching** ([`intent`]): an ordered keyword rule table maps an
//!   utterance to exactly one intent.
//! - **Response generation** ([`response`]): a pure function of the utterance,
//!   the history, the persona and the current time.
//! - **Conversation state** ([`conversation`]): the transcript, the task and
//!   file ledgers, and the two-turn pending-action machine.
//! - **Session** ([`session`]): an actor that serialises turns, simulates
//!   thinking time and drives speech capture/playback providers.
//! - **Host bridge** ([`host`]): versioned JSON envelopes for rendering layers.

pub mod config;
pub mod conversation;
pub mod error;
pub mod host;
pub mod intent;
pub mod persona;
pub mod response;
pub mod session;
pub mod speech;

pub use config::AssistantConfig;
pub use conversation::state::ConversationSnapshot;
pub use conversation::{Conversation, TurnKind, TurnOutcome};
pub use error::{AssistantError, Result};
pub use intent::{Intent, match_intent};
pub use response::{GeneratedReply, generate};
pub use session::{AssistantSession, SessionEvent, SessionHandle, session_channel};

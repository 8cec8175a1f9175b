//! The turn-taking state machine and the data it owns.
//!
//! A [`Conversation`] is either idle or awaiting fulfillment of a single
//! [`PendingAction`](state::PendingAction). While idle, utterances go through
//! the intent matcher and response generator; while awaiting, the next
//! utterance is consumed as content for the pending action.

pub mod clock;
pub mod ledger;
pub mod machine;
pub mod message;
pub mod state;

pub use machine::{
    Conversation, FileDelivery, FileDownload, LedgerChange, TurnKind, TurnOutcome, UserTurn,
};

//! Transcript message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form metadata attached to a message or pending action.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// Rendering hint for a message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    File,
    Task,
}

/// A single transcript entry. Never mutated after creation.
///
/// `content` is stored verbatim, including `**emphasis**` and list markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Message {
    /// Create a user-authored text message.
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::User, content, timestamp)
    }

    /// Create an agent-authored text message.
    pub fn agent(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::Agent, content, timestamp)
    }

    fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp,
            kind: MessageKind::Text,
            metadata: Metadata::new(),
        }
    }

    /// Set the rendering hint.
    #[must_use]
    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Text handed to the playback provider for a reply: its first line with
/// emphasis markers removed.
pub fn spoken_summary(content: &str) -> String {
    content.lines().next().unwrap_or("").replace("**", "").trim().to_owned()
}

/// First sentence of a confirmation, split on `". "` so that dotted file
/// names such as `document_1.txt` stay intact.
pub fn first_sentence(content: &str) -> String {
    let first_line = spoken_summary(content);
    match first_line.find(". ") {
        Some(idx) => first_line[..=idx].to_owned(),
        None => first_line,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn markers_survive_serialization() {
        let content = "**Sure!** Here's a list:\n1. one\n2. two\n- bullet";
        let msg = Message::agent(content, Utc::now());
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.content, content);
        assert_eq!(parsed, msg);
    }

    #[test]
    fn empty_metadata_is_omitted() {
        let msg = Message::user("hi", Utc::now());
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("metadata").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["kind"], "text");
    }

    #[test]
    fn ids_are_unique() {
        let now = Utc::now();
        assert_ne!(Message::user("a", now).id, Message::user("a", now).id);
    }

    #[test]
    fn spoken_summary_takes_first_line_without_markers() {
        assert_eq!(
            spoken_summary("**Hello Somil!** How are you?\n\n- more"),
            "Hello Somil! How are you?"
        );
        assert_eq!(spoken_summary(""), "");
    }

    #[test]
    fn first_sentence_keeps_dotted_names() {
        assert_eq!(
            first_sentence("I've created \"document_1.txt\" for you. You can find it."),
            "I've created \"document_1.txt\" for you."
        );
        assert_eq!(first_sentence("No period here"), "No period here");
    }
}

//! Persona profile consumed read-only by the response generator.
//!
//! The profile describes the person the assistant serves: their name, a few
//! speaking-style tags, topics they care about, and a language code. It is
//! fixed for the lifetime of a session.

use serde::{Deserialize, Serialize};

/// Welcome text shown as the first agent message of every session.
pub const STARTUP_MESSAGE: &str = "\
**Welcome!** Your personal AI agent, created by you, is ready.\n\
\n\
I can help you with:\n\
- **Creating documents** (say \"create a document\")\n\
- **Managing tasks** (say \"remind me to...\")\n\
- **Telling the time** (ask \"what time is it?\")\n\
- **Explaining topics** (ask \"explain machine learning\")\n\
\n\
How can I assist you today?";

/// Spoken version of [`STARTUP_MESSAGE`].
pub const STARTUP_SPEECH: &str =
    "Welcome. Your personal AI agent, created by you, is ready. How can I assist you today?";

/// Style tag that switches the generator to informal wording.
pub const STYLE_CASUAL: &str = "casual";

/// Static per-session persona descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaProfile {
    /// Name used when addressing the user. Empty means "don't use a name".
    pub name: String,
    /// Free-form style tags, e.g. `"casual"`.
    pub speaking_style: Vec<String>,
    /// Topics the user is interested in.
    pub topics: Vec<String>,
    /// BCP-47 language code.
    pub language: String,
}

impl Default for PersonaProfile {
    fn default() -> Self {
        Self {
            name: "Somil".to_owned(),
            speaking_style: Vec::new(),
            topics: Vec::new(),
            language: "en".to_owned(),
        }
    }
}

impl PersonaProfile {
    /// Returns `true` if the profile carries the given style tag (case-insensitive).
    pub fn has_style(&self, tag: &str) -> bool {
        self.speaking_style
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(tag))
    }

    /// The trimmed display name, or `None` when no name is configured.
    pub fn display_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }
}

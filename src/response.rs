//! Reply generation on top of the intent matcher.
//!
//! [`generate`] is a pure function of the utterance and its [`ReplyContext`]:
//! the clock reading is passed in, and history only selects between fixed
//! wording variants, so identical inputs always yield identical replies.
//! Replies may contain `**emphasis**` and list markers for the renderer.

use crate::conversation::message::{Message, Metadata, Role};
use crate::conversation::state::ActionKind;
use crate::intent::{Intent, IntentTag, match_intent};
use crate::persona::{PersonaProfile, STYLE_CASUAL};
use chrono::{DateTime, FixedOffset};

/// Metadata key carrying the inferred file type of a create-file request.
pub const META_FILE_TYPE: &str = "file_type";
/// Metadata key carrying the task title hint of a create-task request.
pub const META_SUGGESTED_TITLE: &str = "suggested_title";
/// Metadata key carrying the matched intent name.
pub const META_INTENT: &str = "intent";
/// Metadata key on user messages that supplied content for a pending action.
/// Its value is the action name.
pub const META_FULFILLS: &str = "fulfills";

/// Reply text shown for empty or whitespace-only input.
pub const EMPTY_INPUT_REPLY: &str =
    "I didn't catch that. Could you say it again or type your message?";

/// Read-only inputs to [`generate`].
#[derive(Debug, Clone, Copy)]
pub struct ReplyContext<'a> {
    /// Transcript before the current utterance.
    pub history: &'a [Message],
    pub persona: &'a PersonaProfile,
    /// Wall-clock reading used by time queries.
    pub now: DateTime<FixedOffset>,
}

/// Output of [`generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReply {
    pub response: String,
    /// Set for create requests; tells the state machine to open a pending action.
    pub action: Option<ActionKind>,
    pub metadata: Metadata,
}

impl GeneratedReply {
    fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            action: None,
            metadata: Metadata::new(),
        }
    }
}

/// Produce the agent reply for one utterance.
pub fn generate(input: &str, ctx: &ReplyContext<'_>) -> GeneratedReply {
    let intent = match_intent(input);
    let tag = intent.tag();
    tracing::debug!(intent = tag.as_str(), "matched intent");

    let mut reply = match intent {
        Intent::Empty => GeneratedReply::text(EMPTY_INPUT_REPLY),
        Intent::Greeting => GeneratedReply::text(greeting(ctx)),
        Intent::CapabilityQuery => GeneratedReply::text(capabilities(ctx.persona)),
        Intent::TimeQuery => GeneratedReply::text(time_of_day(ctx.now)),
        Intent::CreateFile { file_type } => {
            let mut metadata = Metadata::new();
            let heading = match file_type {
                Some(ft) => {
                    metadata.insert(META_FILE_TYPE.to_owned(), ft.extension().into());
                    format!(
                        "**Sure, let's create a {} file.**",
                        ft.extension().to_uppercase()
                    )
                }
                None => "**Sure, let's create a new document.**".to_owned(),
            };
            GeneratedReply {
                response: format!(
                    "{heading}\n\nWhat content would you like me to put in it? \
                     Just type or say it and I'll save it for you."
                ),
                action: Some(ActionKind::CreateFile),
                metadata,
            }
        }
        Intent::CreateTask { suggested_title } => {
            let mut metadata = Metadata::new();
            let response = match suggested_title {
                Some(title) => {
                    let text = format!(
                        "**Got it, let's add a task.**\n\nWhat should the task say? \
                         For example: \"{title}\"."
                    );
                    metadata.insert(META_SUGGESTED_TITLE.to_owned(), title.into());
                    text
                }
                None => "**Got it, let's add a task.**\n\nWhat should the task say?".to_owned(),
            };
            GeneratedReply {
                response,
                action: Some(ActionKind::CreateTask),
                metadata,
            }
        }
        Intent::ExplainTopic { topic } => GeneratedReply::text(explain(topic.as_deref())),
        Intent::Identity => GeneratedReply::text(identity(ctx.persona)),
        Intent::Gratitude => GeneratedReply::text(format!(
            "You're welcome{}! Is there anything else I can help with?",
            comma_name(ctx.persona)
        )),
        Intent::Farewell => GeneratedReply::text(format!(
            "Goodbye{}! I'll be here whenever you need me.",
            comma_name(ctx.persona)
        )),
        Intent::Fallback => GeneratedReply::text(fallback(input)),
    };

    if tag != IntentTag::Empty {
        reply
            .metadata
            .insert(META_INTENT.to_owned(), tag.as_str().into());
    }
    reply
}

// ── Wording ─────────────────────────────────────────────────────────────

fn comma_name(persona: &PersonaProfile) -> String {
    persona
        .display_name()
        .map(|n| format!(", {n}"))
        .unwrap_or_default()
}

fn space_name(persona: &PersonaProfile) -> String {
    persona
        .display_name()
        .map(|n| format!(" {n}"))
        .unwrap_or_default()
}

/// Earlier greetings pick the wording variant so repeats don't echo.
fn greeting(ctx: &ReplyContext<'_>) -> String {
    let earlier = ctx
        .history
        .iter()
        .filter(|m| {
            m.role == Role::User
                && !m.metadata.contains_key(META_FULFILLS)
                && match_intent(&m.content) == Intent::Greeting
        })
        .count();
    let hello = if ctx.persona.has_style(STYLE_CASUAL) {
        "Hey"
    } else {
        "Hello"
    };
    let name = space_name(ctx.persona);

    match earlier % 3 {
        0 => format!(
            "**{hello}{name}!** How can I help you today?\n\n\
             You can ask me to create a document, add a task, tell you the time, or explain a topic."
        ),
        1 => format!("**{hello} again{name}!** What would you like to do next?"),
        _ => format!("**Still here{name}!** Just tell me what you need."),
    }
}

fn capabilities(persona: &PersonaProfile) -> String {
    let mut text = String::from(
        "**Here's what I can do for you:**\n\n\
         1. **Create documents** - say \"create a document\" and then give me the content\n\
         2. **Manage tasks** - say \"remind me to...\" to add a task\n\
         3. **Tell the time** - ask \"what time is it?\"\n\
         4. **Explain topics** - ask \"explain machine learning\"",
    );
    if !persona.topics.is_empty() {
        text.push_str(&format!(
            "\n\nI can also talk about the topics you follow: {}.",
            persona.topics.join(", ")
        ));
    }
    text.push_str("\n\nWhat would you like to try?");
    text
}

fn time_of_day(now: DateTime<FixedOffset>) -> String {
    format!(
        "It's currently **{}** on **{}**.",
        now.format("%-I:%M %p"),
        now.format("%A, %B %-d, %Y")
    )
}

fn identity(persona: &PersonaProfile) -> String {
    match persona.display_name() {
        Some(name) => format!(
            "**I'm your personal AI agent.** {name} created me to help with documents, \
             tasks, and quick questions."
        ),
        None => "**I'm your personal AI agent.** I help with documents, tasks, and quick questions."
            .to_owned(),
    }
}

fn fallback(input: &str) -> String {
    format!(
        "I'm not sure I understood \"{}\".\n\n\
         Here's what I can help with:\n\
         - **Create a document** (\"create a document\")\n\
         - **Add a task** (\"remind me to...\")\n\
         - **Tell the time** (\"what time is it?\")\n\
         - **Explain a topic** (\"explain machine learning\")",
        input.trim()
    )
}

// ── Topic notes ─────────────────────────────────────────────────────────

/// (aliases, title, summary, key points). More specific aliases come first.
const TOPIC_NOTES: &[(&[&str], &str, &str, &[&str])] = &[
    (
        &["machine learning", "ml"],
        "Machine Learning",
        "Machine learning is a branch of AI where programs learn patterns from data \
         instead of following hand-written rules.",
        &[
            "Models are trained on examples",
            "Supervised, unsupervised and reinforcement learning are the main styles",
            "Used for recommendations, speech recognition and image search",
        ],
    ),
    (
        &["artificial intelligence", "ai"],
        "Artificial Intelligence",
        "Artificial intelligence is the field of building systems that perform tasks \
         that normally need human intelligence.",
        &[
            "Covers reasoning, perception, language and planning",
            "Ranges from simple rule systems to large neural networks",
            "I'm a small rule-based example myself",
        ],
    ),
    (
        &["rust"],
        "Rust",
        "Rust is a systems programming language focused on speed, memory safety and \
         fearless concurrency.",
        &[
            "Ownership and borrowing replace a garbage collector",
            "Strong type system with traits and enums",
            "Cargo handles builds and dependencies",
        ],
    ),
    (
        &["python"],
        "Python",
        "Python is a general-purpose programming language known for readable syntax \
         and a huge ecosystem.",
        &[
            "Popular for scripting, data science and web backends",
            "Dynamically typed and interpreted",
            "Thousands of packages on PyPI",
        ],
    ),
    (
        &["blockchain", "cryptocurrency", "crypto"],
        "Blockchain",
        "A blockchain is a shared ledger where records are grouped into blocks that \
         are chained together with cryptographic hashes.",
        &[
            "No single party controls the ledger",
            "Past entries are very hard to alter",
            "Underpins cryptocurrencies such as Bitcoin",
        ],
    ),
    (
        &["internet", "web"],
        "The Internet",
        "The internet is a global network of networks that exchange data using shared \
         protocols such as TCP/IP.",
        &[
            "The web is one service that runs on top of it",
            "Data travels in small packets",
            "DNS turns names into addresses",
        ],
    ),
    (
        &["climate change", "global warming", "climate"],
        "Climate Change",
        "Climate change is the long-term shift in global temperatures and weather \
         patterns, driven mainly by greenhouse gas emissions.",
        &[
            "Burning fossil fuels releases carbon dioxide",
            "Leads to rising seas and more extreme weather",
            "Mitigation focuses on cutting emissions",
        ],
    ),
];

fn explain(topic: Option<&str>) -> String {
    let Some(topic) = topic else {
        return "Sure! Which topic would you like me to explain?".to_owned();
    };

    let padded = format!(" {topic} ");
    let note = TOPIC_NOTES.iter().find(|(aliases, ..)| {
        aliases
            .iter()
            .any(|alias| padded.contains(&format!(" {alias} ")))
    });

    match note {
        Some((_, title, summary, points)) => {
            let bullets: Vec<String> = points.iter().map(|p| format!("- {p}")).collect();
            format!(
                "**{title}**\n\n{summary}\n\nKey points:\n{}\n\n\
                 Would you like me to create a document about this?",
                bullets.join("\n")
            )
        }
        None => format!(
            "**{topic}** is an interesting subject, but I don't have notes on it yet.\n\n\
             Here's how you could explore it:\n\
             1. Start with a short overview or encyclopedia entry\n\
             2. Note down the key terms you don't know\n\
             3. Ask me to add \"learn about {topic}\" to your tasks"
        ),
    }
}

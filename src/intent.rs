//! Deterministic intent matching for user utterances.
//!
//! An utterance is normalised (lower-cased, whitespace collapsed, edge
//! punctuation stripped from every word) and tested against [`INTENT_RULES`]
//! top to bottom. The first rule with a firing trigger wins; there is no
//! scoring. Utterances that match nothing resolve to [`Intent::Fallback`].
//!
//! # Rule order
//!
//! | Priority | Intent | Example |
//! |----------|--------|---------|
//! | 1 | `CreateTask` | "remind me to buy milk" |
//! | 2 | `CreateFile` | "create a pdf document" |
//! | 3 | `TimeQuery` | "what time is it" |
//! | 4 | `CapabilityQuery` | "what can you do" |
//! | 5 | `Identity` | "who are you" |
//! | 6 | `ExplainTopic` | "explain machine learning" |
//! | 7 | `Gratitude` | "thanks" |
//! | 8 | `Farewell` | "goodbye" |
//! | 9 | `Greeting` | "hello" |

use crate::conversation::ledger::FileType;

/// The classified purpose of one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Nothing but whitespace.
    Empty,
    Greeting,
    CapabilityQuery,
    TimeQuery,
    /// Request to create a file; `file_type` is set when the utterance names one.
    CreateFile { file_type: Option<FileType> },
    /// Request to create a task; `suggested_title` is whatever followed "remind me to".
    CreateTask { suggested_title: Option<String> },
    /// Request to explain something; `topic` is `None` for a bare "explain".
    ExplainTopic { topic: Option<String> },
    Identity,
    Gratitude,
    Farewell,
    /// No rule matched.
    Fallback,
}

impl Intent {
    /// The payload-free tag for this intent.
    #[must_use]
    pub fn tag(&self) -> IntentTag {
        match self {
            Self::Empty => IntentTag::Empty,
            Self::Greeting => IntentTag::Greeting,
            Self::CapabilityQuery => IntentTag::CapabilityQuery,
            Self::TimeQuery => IntentTag::TimeQuery,
            Self::CreateFile { .. } => IntentTag::CreateFile,
            Self::CreateTask { .. } => IntentTag::CreateTask,
            Self::ExplainTopic { .. } => IntentTag::ExplainTopic,
            Self::Identity => IntentTag::Identity,
            Self::Gratitude => IntentTag::Gratitude,
            Self::Farewell => IntentTag::Farewell,
            Self::Fallback => IntentTag::Fallback,
        }
    }
}

/// Payload-free intent identifier used by the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentTag {
    Empty,
    Greeting,
    CapabilityQuery,
    TimeQuery,
    CreateFile,
    CreateTask,
    ExplainTopic,
    Identity,
    Gratitude,
    Farewell,
    Fallback,
}

impl IntentTag {
    /// Stable snake_case name, used in logs and message metadata.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Greeting => "greeting",
            Self::CapabilityQuery => "capability_query",
            Self::TimeQuery => "time_query",
            Self::CreateFile => "create_file",
            Self::CreateTask => "create_task",
            Self::ExplainTopic => "explain_topic",
            Self::Identity => "identity",
            Self::Gratitude => "gratitude",
            Self::Farewell => "farewell",
            Self::Fallback => "fallback",
        }
    }
}

/// A single predicate over a normalised utterance.
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// Any phrase occurs on word boundaries.
    Phrase(&'static [&'static str]),
    /// The utterance starts with one of the phrases (followed by a word boundary).
    Leading(&'static [&'static str]),
    /// The whole utterance equals one of the phrases.
    Whole(&'static [&'static str]),
    /// At least one verb word and at least one noun word are present.
    Pair {
        verbs: &'static [&'static str],
        nouns: &'static [&'static str],
    },
}

impl Trigger {
    fn fires(&self, utterance: &Normalized) -> bool {
        match self {
            Self::Phrase(phrases) => phrases.iter().any(|p| utterance.contains_phrase(p)),
            Self::Leading(phrases) => phrases.iter().any(|p| utterance.starts_with_phrase(p)),
            Self::Whole(phrases) => phrases.iter().any(|p| utterance.text == *p),
            Self::Pair { verbs, nouns } => {
                utterance.has_any_word(verbs) && utterance.has_any_word(nouns)
            }
        }
    }
}

/// One row of the ordered rule table.
#[derive(Debug, Clone, Copy)]
pub struct IntentRule {
    pub tag: IntentTag,
    /// The rule fires when any trigger fires.
    pub triggers: &'static [Trigger],
}

// ── Trigger vocabularies ────────────────────────────────────────────────

const EXPLAIN_LEADERS: &[&str] = &[
    "explain",
    "tell me about",
    "what is",
    "what's",
    "what are",
    "how does",
    "how do",
    "describe",
    "define",
    "who is",
    "who was",
];

const TASK_TITLE_LEADERS: &[&str] = &[
    "remind me to",
    "remind me",
    "add a task to",
    "add a task",
    "add task",
    "create a task to",
    "create a task",
    "new task",
];

/// Ordered rule table; earlier rows take priority.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        tag: IntentTag::CreateTask,
        triggers: &[
            Trigger::Phrase(&[
                "remind me",
                "add a task",
                "add task",
                "create a task",
                "new task",
                "add to my list",
                "add to my tasks",
                "set a reminder",
                "to do list",
                "todo",
                "to-do",
            ]),
            Trigger::Pair {
                verbs: &["add", "create", "make", "new", "set"],
                nouns: &["task", "reminder", "todo", "to-do"],
            },
        ],
    },
    IntentRule {
        tag: IntentTag::CreateFile,
        triggers: &[Trigger::Pair {
            verbs: &[
                "create", "make", "write", "draft", "generate", "prepare", "new",
            ],
            nouns: &[
                "file", "document", "doc", "docx", "pdf", "note", "txt", "letter", "report",
            ],
        }],
    },
    IntentRule {
        tag: IntentTag::TimeQuery,
        triggers: &[Trigger::Phrase(&[
            "what time",
            "the time",
            "time is it",
            "current time",
            "what day",
            "what date",
            "the date",
            "today's date",
        ])],
    },
    IntentRule {
        tag: IntentTag::CapabilityQuery,
        triggers: &[
            Trigger::Phrase(&[
                "what can you do",
                "what do you do",
                "how can you help",
                "your capabilities",
                "what are you capable",
                "help me",
            ]),
            Trigger::Whole(&["help"]),
        ],
    },
    IntentRule {
        tag: IntentTag::Identity,
        triggers: &[Trigger::Phrase(&[
            "who are you",
            "your name",
            "who made you",
            "who created you",
            "what are you",
        ])],
    },
    IntentRule {
        tag: IntentTag::ExplainTopic,
        triggers: &[Trigger::Leading(EXPLAIN_LEADERS)],
    },
    IntentRule {
        tag: IntentTag::Gratitude,
        triggers: &[Trigger::Phrase(&["thank you", "thanks", "appreciate it"])],
    },
    IntentRule {
        tag: IntentTag::Farewell,
        triggers: &[Trigger::Phrase(&[
            "goodbye",
            "bye",
            "see you",
            "good night",
        ])],
    },
    IntentRule {
        tag: IntentTag::Greeting,
        triggers: &[Trigger::Phrase(&[
            "hello",
            "hi",
            "hey",
            "good morning",
            "good afternoon",
            "good evening",
            "greetings",
            "howdy",
        ])],
    },
];

/// Exact replies that abort a pending action.
pub const CANCEL_PHRASES: &[&str] = &["cancel", "never mind", "nevermind", "forget it", "stop"];

/// Classify an utterance.
///
/// Pure and deterministic: inputs that differ only in case or whitespace
/// always produce the same intent.
pub fn match_intent(input: &str) -> Intent {
    let utterance = Normalized::new(input);
    if utterance.text.is_empty() {
        return Intent::Empty;
    }

    let Some(tag) = classify(&utterance) else {
        return Intent::Fallback;
    };

    match tag {
        IntentTag::CreateFile => Intent::CreateFile {
            file_type: infer_file_type(&utterance),
        },
        IntentTag::CreateTask => Intent::CreateTask {
            suggested_title: remainder_after(&utterance, TASK_TITLE_LEADERS),
        },
        IntentTag::ExplainTopic => Intent::ExplainTopic {
            topic: remainder_after(&utterance, EXPLAIN_LEADERS).map(|t| strip_filler(&t)),
        },
        IntentTag::Greeting => Intent::Greeting,
        IntentTag::CapabilityQuery => Intent::CapabilityQuery,
        IntentTag::TimeQuery => Intent::TimeQuery,
        IntentTag::Identity => Intent::Identity,
        IntentTag::Gratitude => Intent::Gratitude,
        IntentTag::Farewell => Intent::Farewell,
        IntentTag::Empty | IntentTag::Fallback => Intent::Fallback,
    }
}

/// Returns `true` if the whole utterance is one of [`CANCEL_PHRASES`].
pub fn is_cancel_phrase(input: &str) -> bool {
    let utterance = Normalized::new(input);
    CANCEL_PHRASES.contains(&utterance.text.as_str())
}

/// Collapse whitespace, lower-case, and strip edge punctuation from each word.
pub fn normalize(input: &str) -> String {
    Normalized::new(input).text
}

// ── Internals ───────────────────────────────────────────────────────────

fn classify(utterance: &Normalized) -> Option<IntentTag> {
    INTENT_RULES
        .iter()
        .find(|rule| rule.triggers.iter().any(|t| t.fires(utterance)))
        .map(|rule| rule.tag)
}

fn infer_file_type(utterance: &Normalized) -> Option<FileType> {
    if utterance.has_any_word(&["pdf"]) {
        Some(FileType::Pdf)
    } else if utterance.has_any_word(&["doc", "docx", "word"]) {
        Some(FileType::Doc)
    } else if utterance.has_any_word(&["txt", "text"]) {
        Some(FileType::Txt)
    } else {
        None
    }
}

/// Text following the first leading phrase found, if non-empty.
fn remainder_after(utterance: &Normalized, leaders: &[&str]) -> Option<String> {
    leaders.iter().find_map(|leader| {
        let padded = format!(" {leader} ");
        let haystack = format!(" {} ", utterance.text);
        let idx = haystack.find(&padded)?;
        let rest = haystack[idx + padded.len()..].trim();
        (!rest.is_empty()).then(|| rest.to_owned())
    })
}

/// Drop "to me" / articles in front of an explain topic.
fn strip_filler(topic: &str) -> String {
    let mut rest = topic;
    for prefix in ["to me ", "me ", "about "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
        }
    }
    for article in ["a ", "an ", "the "] {
        if let Some(stripped) = rest.strip_prefix(article) {
            rest = stripped;
            break;
        }
    }
    rest.trim().to_owned()
}

struct Normalized {
    text: String,
}

impl Normalized {
    fn new(input: &str) -> Self {
        let text = input
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| matches!(c, '?' | '!' | '.' | ',' | ';' | ':' | '"'))
                    .to_lowercase()
            })
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self { text }
    }

    fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split(' ')
    }

    fn has_any_word(&self, candidates: &[&str]) -> bool {
        self.words().any(|w| candidates.contains(&w))
    }

    fn contains_phrase(&self, phrase: &str) -> bool {
        format!(" {} ", self.text).contains(&format!(" {phrase} "))
    }

    fn starts_with_phrase(&self, phrase: &str) -> bool {
        self.text == phrase
            || self
                .text
                .strip_prefix(phrase)
                .is_some_and(|rest| rest.starts_with(' '))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    // ── Normalisation ───────────────────────────────────────────────────

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Hello   THERE!  "), "hello there");
        assert_eq!(normalize("What's the time?"), "what's the time");
        assert_eq!(normalize("\t\n"), "");
    }

    // ── Families ────────────────────────────────────────────────────────

    #[test]
    fn greeting() {
        assert_eq!(match_intent("Hello"), Intent::Greeting);
        assert_eq!(match_intent("hey there"), Intent::Greeting);
        assert_eq!(match_intent("Good morning!"), Intent::Greeting);
    }

    #[test]
    fn greeting_needs_word_boundary() {
        // "this" and "which" contain "hi" but are not greetings.
        assert_eq!(match_intent("which one is this"), Intent::Fallback);
    }

    #[test]
    fn capability_query() {
        assert_eq!(match_intent("What can you do?"), Intent::CapabilityQuery);
        assert_eq!(match_intent("help"), Intent::CapabilityQuery);
        assert_eq!(
            match_intent("what are you capable of"),
            Intent::CapabilityQuery
        );
    }

    #[test]
    fn help_me_matches_anywhere_in_the_utterance() {
        for input in ["can you help me", "help me please", "please help me out"] {
            assert_eq!(match_intent(input), Intent::CapabilityQuery, "{input}");
        }
        // Bare "help" only counts as the whole utterance.
        assert_eq!(match_intent("that is no help"), Intent::Fallback);
    }

    #[test]
    fn time_query() {
        assert_eq!(match_intent("what time is it"), Intent::TimeQuery);
        assert_eq!(match_intent("What's the date today?"), Intent::TimeQuery);
        assert_eq!(match_intent("what day is it"), Intent::TimeQuery);
    }

    #[test]
    fn create_file_without_type() {
        assert_eq!(
            match_intent("create a document"),
            Intent::CreateFile { file_type: None }
        );
    }

    #[test]
    fn create_file_infers_type() {
        assert_eq!(
            match_intent("Make me a PDF"),
            Intent::CreateFile {
                file_type: Some(FileType::Pdf)
            }
        );
        assert_eq!(
            match_intent("write a word document"),
            Intent::CreateFile {
                file_type: Some(FileType::Doc)
            }
        );
        assert_eq!(
            match_intent("create a text file"),
            Intent::CreateFile {
                file_type: Some(FileType::Txt)
            }
        );
    }

    #[test]
    fn create_task_with_suggested_title() {
        assert_eq!(
            match_intent("Remind me to buy milk"),
            Intent::CreateTask {
                suggested_title: Some("buy milk".to_owned())
            }
        );
        assert_eq!(
            match_intent("add a task"),
            Intent::CreateTask {
                suggested_title: None
            }
        );
        assert_eq!(
            match_intent("set a reminder"),
            Intent::CreateTask {
                suggested_title: None
            }
        );
    }

    #[test]
    fn explain_topic_extracts_topic() {
        assert_eq!(
            match_intent("Explain machine learning"),
            Intent::ExplainTopic {
                topic: Some("machine learning".to_owned())
            }
        );
        assert_eq!(
            match_intent("what is the internet?"),
            Intent::ExplainTopic {
                topic: Some("internet".to_owned())
            }
        );
        assert_eq!(
            match_intent("explain to me quantum physics"),
            Intent::ExplainTopic {
                topic: Some("quantum physics".to_owned())
            }
        );
        assert_eq!(
            match_intent("explain"),
            Intent::ExplainTopic { topic: None }
        );
    }

    #[test]
    fn supplementary_families() {
        assert_eq!(match_intent("who are you"), Intent::Identity);
        assert_eq!(match_intent("Thanks!"), Intent::Gratitude);
        assert_eq!(match_intent("bye"), Intent::Farewell);
    }

    #[test]
    fn empty_and_fallback() {
        assert_eq!(match_intent(""), Intent::Empty);
        assert_eq!(match_intent("   "), Intent::Empty);
        assert_eq!(match_intent("purple monkey dishwasher"), Intent::Fallback);
    }

    // ── Priority ────────────────────────────────────────────────────────

    #[test]
    fn specific_intent_beats_greeting() {
        assert_eq!(
            match_intent("hi, please create a document"),
            Intent::CreateFile { file_type: None }
        );
        assert_eq!(match_intent("hey what time is it"), Intent::TimeQuery);
    }

    #[test]
    fn time_beats_explain() {
        assert_eq!(match_intent("what is the time"), Intent::TimeQuery);
        assert_eq!(match_intent("what's the time"), Intent::TimeQuery);
    }

    #[test]
    fn task_beats_file() {
        assert_eq!(
            match_intent("create a task to write the report"),
            Intent::CreateTask {
                suggested_title: Some("write the report".to_owned())
            }
        );
    }

    #[test]
    fn identity_beats_explain() {
        assert_eq!(match_intent("what are you"), Intent::Identity);
    }

    #[test]
    fn rule_table_order_is_stable() {
        let order: Vec<IntentTag> = INTENT_RULES.iter().map(|r| r.tag).collect();
        assert_eq!(
            order,
            vec![
                IntentTag::CreateTask,
                IntentTag::CreateFile,
                IntentTag::TimeQuery,
                IntentTag::CapabilityQuery,
                IntentTag::Identity,
                IntentTag::ExplainTopic,
                IntentTag::Gratitude,
                IntentTag::Farewell,
                IntentTag::Greeting,
            ]
        );
    }

    #[test]
    fn every_rule_has_triggers() {
        for rule in INTENT_RULES {
            assert!(!rule.triggers.is_empty(), "{:?} has no triggers", rule.tag);
        }
    }

    // ── Determinism ─────────────────────────────────────────────────────

    #[test]
    fn case_and_whitespace_insensitive() {
        let inputs = [
            "create a document",
            "  CREATE   a\tDocument ",
            "Create A Document",
        ];
        let first = match_intent(inputs[0]);
        for input in inputs {
            assert_eq!(match_intent(input), first, "input {input:?}");
        }
    }

    #[test]
    fn repeated_calls_agree() {
        for input in ["hello", "remind me to call mom", "gibberish words", ""] {
            assert_eq!(match_intent(input), match_intent(input));
        }
    }

    // ── Cancel phrases ──────────────────────────────────────────────────

    #[test]
    fn cancel_phrase_must_be_whole_utterance() {
        assert!(is_cancel_phrase("Never mind."));
        assert!(is_cancel_phrase("  cancel "));
        assert!(!is_cancel_phrase("cancel the dentist appointment"));
        assert!(!is_cancel_phrase(""));
    }

    #[test]
    fn intent_tag_names() {
        assert_eq!(
            match_intent("create a pdf").tag().as_str(),
            "create_file"
        );
        assert_eq!(IntentTag::Fallback.as_str(), "fallback");
    }
}

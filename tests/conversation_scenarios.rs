use chrono::{FixedOffset, TimeZone};
use parlor::config::{AssistantConfig, EmptyFulfillmentPolicy};
use parlor::conversation::clock::FixedClock;
use parlor::conversation::ledger::{FileType, TaskStatus};
use parlor::conversation::message::{MessageKind, Role};
use parlor::conversation::state::ActionKind;
use parlor::conversation::{Conversation, LedgerChange, TurnKind};
use parlor::response::EMPTY_INPUT_REPLY;
use std::sync::Arc;

fn conversation_with(config: &AssistantConfig) -> Conversation {
    let offset = FixedOffset::west_opt(4 * 3600).expect("valid offset");
    let now = offset
        .with_ymd_and_hms(2026, 10, 19, 9, 30, 0)
        .single()
        .expect("valid timestamp");
    Conversation::with_clock(config, Arc::new(FixedClock(now)))
}

fn conversation() -> Conversation {
    conversation_with(&AssistantConfig::default())
}

#[test]
fn document_request_then_content_creates_txt_file() {
    let mut conv = conversation();

    let ask = conv.submit("create a document");
    assert_eq!(ask.kind, TurnKind::Reply);
    assert_eq!(ask.reply.kind, MessageKind::File);
    assert_eq!(
        conv.pending_action().map(|p| p.kind),
        Some(ActionKind::CreateFile)
    );

    let done = conv.submit("hello world");
    assert_eq!(done.kind, TurnKind::Fulfillment);
    assert!(conv.pending_action().is_none());

    let files: Vec<_> = conv.state().files().iter().collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].content, "hello world");
    assert_eq!(files[0].file_type, FileType::Txt);
    assert!(files[0].name.ends_with(".txt"));
    assert!(done.reply.content.contains(&files[0].name));
}

#[test]
fn reminder_then_title_appends_pending_task() {
    let mut conv = conversation();

    let ask = conv.submit("remind me to buy milk");
    assert_eq!(ask.reply.kind, MessageKind::Task);
    assert_eq!(
        conv.pending_action().map(|p| p.kind),
        Some(ActionKind::CreateTask)
    );

    let done = conv.submit("buy milk");
    let Some(LedgerChange::TaskAdded { task }) = done.ledger_change else {
        panic!("expected a task to be added");
    };
    assert_eq!(task.title, "buy milk");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(conv.state().tasks().len(), 1);
}

#[test]
fn empty_input_while_idle_changes_nothing_but_the_transcript() {
    let mut conv = conversation();

    let outcome = conv.submit("");
    assert_eq!(outcome.reply.content, EMPTY_INPUT_REPLY);
    assert!(conv.pending_action().is_none());
    assert!(conv.state().tasks().is_empty());
    assert!(conv.state().files().is_empty());
    assert_eq!(conv.state().messages().len(), 2);
}

#[test]
fn toggling_twice_restores_status() {
    let mut conv = conversation();
    conv.submit("add a task");
    conv.submit("water plants");
    let id = conv
        .state()
        .tasks()
        .iter()
        .next()
        .expect("task created")
        .id
        .clone();

    assert_eq!(conv.toggle_task(&id), Some(TaskStatus::Completed));
    assert_eq!(conv.toggle_task(&id), Some(TaskStatus::Pending));
    assert_eq!(conv.toggle_task("missing"), None);
}

#[test]
fn deleting_unknown_file_is_a_noop() {
    let mut conv = conversation();
    conv.submit("write a note");
    conv.submit("remember the keys");
    let before = conv.snapshot();

    assert!(!conv.delete_file("no-such-file"));
    assert_eq!(conv.snapshot(), before);
}

#[test]
fn every_message_is_appended_in_order() {
    let mut conv = conversation();
    conv.startup();
    conv.submit("hi");
    conv.submit("what time is it");
    conv.submit("thanks");

    let roles: Vec<_> = conv.state().messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            Role::Agent,
            Role::User,
            Role::Agent,
            Role::User,
            Role::Agent,
            Role::User,
            Role::Agent,
        ]
    );
    assert!(conv.state().messages()[4].content.contains("9:30 AM"));
}

#[test]
fn cancel_escape_can_be_disabled() {
    let mut config = AssistantConfig::default();
    config.conversation.cancel_phrases = false;
    let mut conv = conversation_with(&config);

    conv.submit("add a task");
    let outcome = conv.submit("cancel");
    assert_eq!(outcome.kind, TurnKind::Fulfillment);
    let titles: Vec<_> = conv.state().tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["cancel"]);
}

#[test]
fn accepting_empty_fulfillment_creates_blank_file() {
    let mut config = AssistantConfig::default();
    config.conversation.empty_fulfillment = EmptyFulfillmentPolicy::Accept;
    let mut conv = conversation_with(&config);

    conv.submit("make a pdf");
    let outcome = conv.submit("   ");
    assert_eq!(outcome.kind, TurnKind::Fulfillment);
    let file = conv.state().files().iter().next().expect("file created");
    assert_eq!(file.file_type, FileType::Pdf);
    assert!(file.content.is_empty());
}

#[test]
fn send_file_appends_summary_then_download_confirmation() {
    let mut conv = conversation();
    conv.submit("draft a letter");
    conv.submit("Dear Sam");
    let id = conv.state().files().iter().next().expect("file").id.clone();
    let before = conv.state().messages().len();

    let delivery = conv.send_file(&id, "  Sam  ").expect("send succeeds");
    assert_eq!(delivery.download.content, "Dear Sam");
    assert_eq!(delivery.appended.len(), 2);
    assert!(delivery.appended[0].content.contains("Sam"));
    assert!(delivery.appended[1].content.contains("downloaded successfully"));
    assert_eq!(conv.state().messages().len(), before + 2);
}

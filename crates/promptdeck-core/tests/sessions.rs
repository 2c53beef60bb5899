//! Chat session integration tests over the file-backed history store.

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use promptdeck_core::{
    BackendError, CHAT_ERROR_REPLY, ChatBackend, ChatHistoryStore, ChatSessionManager, Message,
    Role, SessionPhase,
};
use std::sync::Arc;
use tempfile::tempdir;

/// Backend returning queued replies, or an error when the queue is empty.
struct ScriptedBackend {
    replies: Mutex<Vec<Result<String, BackendError>>>,
    calls: Mutex<usize>,
}

impl ScriptedBackend {
    fn new(replies: Vec<Result<String, BackendError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, _messages: &[Message]) -> Result<String, BackendError> {
        *self.calls.lock() += 1;
        let mut replies = self.replies.lock();
        if replies.is_empty() {
            return Err(BackendError::Transport("no scripted reply".to_string()));
        }
        replies.remove(0)
    }
}

fn open_session(
    store: &Arc<ChatHistoryStore>,
    backend: Arc<ScriptedBackend>,
) -> ChatSessionManager {
    ChatSessionManager::open(
        "email-draft",
        "You draft professional follow-up emails.",
        store.clone(),
        backend,
    )
    .expect("open session")
}

#[tokio::test]
async fn successful_turn_grounds_persists_and_replies() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(ChatHistoryStore::new(temp.path()).expect("store"));
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(
        "Here is a draft...".to_string()
    )]));
    let session = open_session(&store, backend.clone());

    let sent = session
        .submit("Write a follow-up email")
        .await
        .expect("submit");
    assert!(sent);
    assert_eq!(backend.calls(), 1);

    let messages = session.messages();
    assert_eq!(
        messages,
        vec![
            Message::system("You draft professional follow-up emails."),
            Message::user("Write a follow-up email"),
            Message::assistant("Here is a draft..."),
        ]
    );
    // System grounding is sent and stored but never rendered.
    assert_eq!(
        session.visible_messages(),
        vec![
            Message::user("Write a follow-up email"),
            Message::assistant("Here is a draft..."),
        ]
    );

    let persisted = store.load("email-draft").expect("load").expect("record");
    assert_eq!(persisted.messages, messages);
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn failed_turn_swallows_error_into_transcript() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(ChatHistoryStore::new(temp.path()).expect("store"));
    let backend = Arc::new(ScriptedBackend::new(vec![Err(BackendError::Status(429))]));
    let session = open_session(&store, backend);

    let sent = session
        .submit("Write a follow-up email")
        .await
        .expect("submit");
    assert!(sent);

    let messages = session.messages();
    assert_eq!(messages.last().expect("reply").role, Role::Assistant);
    assert_eq!(messages.last().expect("reply").content, CHAT_ERROR_REPLY);
    assert_eq!(session.phase(), SessionPhase::Idle);

    // The error reply is part of the persisted record.
    let persisted = store.load("email-draft").expect("load").expect("record");
    assert_eq!(persisted.messages, messages);
}

#[tokio::test]
async fn blank_submissions_are_no_ops() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(ChatHistoryStore::new(temp.path()).expect("store"));
    let backend = Arc::new(ScriptedBackend::new(Vec::new()));
    let session = open_session(&store, backend.clone());

    assert!(!session.submit("").await.expect("empty"));
    assert!(!session.submit("   ").await.expect("whitespace"));
    assert_eq!(backend.calls(), 0);
    assert!(session.messages().is_empty());
    assert_eq!(store.load("email-draft").expect("load"), None);
}

#[tokio::test]
async fn reopened_session_restores_transcript() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(ChatHistoryStore::new(temp.path()).expect("store"));
    let backend = Arc::new(ScriptedBackend::new(vec![
        Ok("First reply".to_string()),
        Ok("Second reply".to_string()),
    ]));

    let session = open_session(&store, backend.clone());
    session.submit("First question").await.expect("submit");
    let before = session.messages();

    // A fresh manager for the same slug picks up where the last one left
    // off, then keeps appending.
    let resumed = open_session(&store, backend);
    assert_eq!(resumed.messages(), before);
    resumed.submit("Second question").await.expect("submit");

    let messages = resumed.messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[4], Message::assistant("Second reply"));
}

#[tokio::test]
async fn clear_deletes_history_and_resets_state() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(ChatHistoryStore::new(temp.path()).expect("store"));
    let backend = Arc::new(ScriptedBackend::new(vec![Ok("Reply".to_string())]));
    let session = open_session(&store, backend);

    session.submit("Question").await.expect("submit");
    assert!(store.load("email-draft").expect("load").is_some());

    session.clear().expect("clear");
    assert!(session.messages().is_empty());
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert_eq!(store.load("email-draft").expect("load"), None);
}

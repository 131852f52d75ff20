mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chat_orchestrator::error::{AppError, InferenceError};
use chat_orchestrator::message::ChatRequest;
use chat_orchestrator::services::inference::{ChatMessage, InferenceBackend};
use chat_orchestrator::services::orchestrator::ChatOrchestrator;
use chat_orchestrator::storage::{ConversationStore, MemoryStore, Role, SqliteStore};
use common::{CountingStore, FakeInference, Script};

fn request(message: &str, use_history: bool, session_id: Option<&str>) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        use_history,
        session_id: session_id.map(str::to_string),
    }
}

/// Echoes the last user message after a pause, long enough for concurrent
/// requests to overlap if nothing serializes them.
struct SlowEcho;

#[async_trait]
impl InferenceBackend for SlowEcho {
    async fn generate(&self, context: &[ChatMessage], _model: &str) -> Result<String, InferenceError> {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let last = context.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(format!("echo: {last}"))
    }
}

#[tokio::test]
async fn n_prior_turns_then_new_message() {
    let store = CountingStore::new();
    let inference = FakeInference::replying("r");
    let chat = ChatOrchestrator::new(store.clone(), inference.clone(), None, "phi");

    for n in 1..=4 {
        chat.handle_chat(request(&format!("m{n}"), true, Some("s")))
            .await
            .unwrap();
        let context = inference.last_context();
        // Two stored turns per earlier exchange, plus the new message.
        assert_eq!(context.len(), 2 * (n - 1) + 1);
        assert_eq!(context.last().unwrap(), &ChatMessage::user(format!("m{n}")));
    }
    assert_eq!(store.appends(), 8);
}

#[tokio::test]
async fn failed_generation_persists_nothing() {
    let store = CountingStore::new();
    let inference = FakeInference::scripted(Script::Unreachable);
    let chat = ChatOrchestrator::new(store.clone(), inference.clone(), Some(6), "phi");

    let err = chat
        .handle_chat(request("hello", true, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Inference(InferenceError::Unreachable(_))));
    assert_eq!(store.appends(), 0);

    // Once the daemon is back, the conversation picks up cleanly.
    inference.set_script(Script::Reply("hi".into()));
    let response = chat.handle_chat(request("hello", true, None)).await.unwrap();
    assert_eq!(response.reply, "hi");
    assert_eq!(inference.last_context(), vec![ChatMessage::user("hello")]);
}

#[tokio::test]
async fn concurrent_requests_on_one_session_do_not_interleave() {
    let store = Arc::new(MemoryStore::new());
    let chat = ChatOrchestrator::new(store.clone(), Arc::new(SlowEcho), None, "phi");

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let chat = chat.clone();
            tokio::spawn(async move {
                chat.handle_chat(request(&format!("q{i}"), true, Some("shared")))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let turns = store.read_history("shared", None).await.unwrap();
    assert_eq!(turns.len(), 10);
    for pair in turns.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].content, format!("echo: {}", pair[0].content));
    }
}

#[tokio::test]
async fn sqlite_backed_exchange_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("chat.db").display());

    {
        let store = Arc::new(SqliteStore::connect(&url).await.unwrap());
        store.init().await.unwrap();
        let chat = ChatOrchestrator::new(store, FakeInference::replying("first reply"), Some(6), "phi");
        chat.handle_chat(request("first", true, Some("disk")))
            .await
            .unwrap();
    }

    let store = Arc::new(SqliteStore::connect(&url).await.unwrap());
    store.init().await.unwrap();
    let inference = FakeInference::replying("second reply");
    let chat = ChatOrchestrator::new(store.clone(), inference.clone(), Some(6), "phi");
    chat.handle_chat(request("second", true, Some("disk")))
        .await
        .unwrap();

    assert_eq!(
        inference.last_context(),
        vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("first reply"),
            ChatMessage::user("second"),
        ]
    );
    assert_eq!(store.read_history("disk", None).await.unwrap().len(), 4);
}

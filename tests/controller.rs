//! Conversation controller tests with scripted and HTTP backends.

mod common;

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chatterm::api::{ChatBackend, ChatClient};
use chatterm::controller::{ConversationController, FALLBACK_REPLY};
use chatterm::error::{SendError, SendResult};
use chatterm::events::{Message, Role};
use common::{Reply, StubServer};
use serde_json::json;

const GREETING: &str = "Hello! How can I help?";

/// Returns queued results in order and records every call
#[derive(Clone, Default)]
struct ScriptedBackend {
    script: Arc<Mutex<VecDeque<SendResult<String>>>>,
    calls: Arc<Mutex<Vec<(String, Vec<Message>)>>>,
}

impl ScriptedBackend {
    fn with(results: Vec<SendResult<String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(results.into())),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, Vec<Message>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ChatBackend for ScriptedBackend {
    fn send_message(
        &self,
        message: &str,
        history: &[Message],
    ) -> impl Future<Output = SendResult<String>> + Send {
        self.calls
            .lock()
            .unwrap()
            .push((message.to_string(), history.to_vec()));
        let result = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SendError::Decode("script exhausted".to_string())));
        async move { result }
    }
}

fn contents(controller: &ConversationController<impl ChatBackend>) -> Vec<(Role, String)> {
    controller
        .transcript()
        .messages()
        .iter()
        .map(|m| (m.role(), m.content().to_string()))
        .collect()
}

#[tokio::test]
async fn starts_with_greeting_only() {
    let controller = ConversationController::new(ScriptedBackend::default(), GREETING);
    assert_eq!(
        contents(&controller),
        vec![(Role::Assistant, GREETING.to_string())]
    );
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn reply_is_appended_after_user_message() {
    let backend = ScriptedBackend::with(vec![Ok("Hi there!".to_string())]);
    let mut controller = ConversationController::new(backend.clone(), GREETING);

    let settlement = controller.send("Hello").await.unwrap();
    assert!(settlement.is_reply());

    assert_eq!(
        contents(&controller),
        vec![
            (Role::Assistant, GREETING.to_string()),
            (Role::User, "Hello".to_string()),
            (Role::Assistant, "Hi there!".to_string()),
        ]
    );
    assert!(!controller.is_busy());

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Hello");
    assert_eq!(calls[0].1.len(), 1);
    assert_eq!(calls[0].1[0].content(), GREETING);
}

#[tokio::test]
async fn history_excludes_the_new_message() {
    let backend = ScriptedBackend::with(vec![Ok("one".to_string()), Ok("two".to_string())]);
    let mut controller = ConversationController::new(backend.clone(), GREETING);

    controller.send("first").await;
    controller.send("second").await;

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    let history: Vec<&str> = calls[1].1.iter().map(|m| m.content()).collect();
    assert_eq!(history, vec![GREETING, "first", "one"]);
}

#[tokio::test]
async fn whitespace_makes_no_call() {
    let backend = ScriptedBackend::default();
    let mut controller = ConversationController::new(backend.clone(), GREETING);

    assert!(controller.send("   \n\t").await.is_none());
    assert!(controller.send("").await.is_none());
    assert_eq!(controller.transcript().len(), 1);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn message_is_trimmed_before_sending() {
    let backend = ScriptedBackend::with(vec![Ok("ok".to_string())]);
    let mut controller = ConversationController::new(backend.clone(), GREETING);

    controller.send("  Hello  ").await;
    assert_eq!(backend.calls()[0].0, "Hello");
    assert_eq!(controller.transcript().messages()[1].content(), "Hello");
}

#[tokio::test]
async fn failure_appends_fallback_without_error_text() {
    let backend = ScriptedBackend::with(vec![Err(SendError::Status {
        status: 500,
        detail: Some("Internal server error: secret stack trace".to_string()),
    })]);
    let mut controller = ConversationController::new(backend, GREETING);

    let settlement = controller.send("Hello").await.unwrap();
    assert!(!settlement.is_reply());

    let transcript = contents(&controller);
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[2], (Role::Assistant, FALLBACK_REPLY.to_string()));
    assert!(transcript.iter().all(|(_, text)| !text.contains("secret")));
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn can_send_again_after_failure() {
    let backend = ScriptedBackend::with(vec![
        Err(SendError::Timeout(30_000)),
        Ok("Back online".to_string()),
    ]);
    let mut controller = ConversationController::new(backend, GREETING);

    controller.send("first").await;
    controller.send("second").await;

    let transcript = contents(&controller);
    assert_eq!(transcript.len(), 5);
    assert_eq!(transcript[2].1, FALLBACK_REPLY);
    assert_eq!(transcript[4].1, "Back online");
}

#[tokio::test]
async fn http_backend_end_to_end() {
    let server = StubServer::start(Reply::json(
        200,
        json!({ "success": true, "response": "**Python** is great", "error_message": null }),
    ))
    .await;
    let client = ChatClient::new(&server.config(5_000)).unwrap();
    let mut controller = ConversationController::new(client, GREETING);

    controller.send("What is Python?").await.unwrap();

    assert_eq!(
        controller.transcript().last().unwrap().content(),
        "**Python** is great"
    );
    let body = server.requests()[0].json();
    assert_eq!(
        body["conversation_history"],
        json!([{ "role": "assistant", "content": GREETING }])
    );
}

#[tokio::test]
async fn http_failure_end_to_end() {
    let server = StubServer::start(Reply::json(
        200,
        json!({ "success": false, "response": null, "error_message": "API key invalid" }),
    ))
    .await;
    let client = ChatClient::new(&server.config(5_000)).unwrap();
    let mut controller = ConversationController::new(client, GREETING);

    controller.send("Hello").await.unwrap();

    let last = controller.transcript().last().unwrap();
    assert_eq!(last.role(), Role::Assistant);
    assert_eq!(last.content(), FALLBACK_REPLY);
}

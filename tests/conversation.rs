//! Integration tests for the conversation engine over a scripted backend.
//!
//! These tests exercise the public API only: session lifecycle, transcript
//! ordering across multiple turns, and the single-flight send gate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use otters::Error;
use otters::chat::{
    ChatBackend, Conversation, FALLBACK_REPLY, NullObserver, SendOutcome, SessionState,
    TranscriptObserver,
};
use otters::types::{Message, Role};

/// A backend that replies with a numbered echo and can be told to fail.
struct EchoBackend {
    counter: AtomicUsize,
    fail_next: Mutex<Option<Error>>,
    gate: Option<Notify>,
}

impl EchoBackend {
    fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            fail_next: Mutex::new(None),
            gate: None,
        }
    }

    fn gated() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            fail_next: Mutex::new(None),
            gate: Some(Notify::new()),
        }
    }

    fn fail_next(&self, error: Error) {
        *self.fail_next.lock().unwrap() = Some(error);
    }
}

#[async_trait::async_trait]
impl ChatBackend for EchoBackend {
    async fn create_session(&self) -> otters::Result<String> {
        Ok("session-1".to_string())
    }

    async fn send_message(
        &self,
        message: &str,
        _session_id: Option<&str>,
    ) -> otters::Result<String> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(error) = self.fail_next.lock().unwrap().take() {
            return Err(error);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("reply {n} to {message}"))
    }
}

/// Observer that records every event, for ordering assertions.
#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl TranscriptObserver for RecordingObserver {
    fn message_appended(&self, message: &Message) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}: {}", message.role, message.text));
    }

    fn pending_changed(&self, pending: bool) {
        self.events.lock().unwrap().push(format!("pending={pending}"));
    }

    fn send_failed(&self, error: &Error) {
        self.events
            .lock()
            .unwrap()
            .push(format!("failed={}", error.kind()));
    }
}

#[tokio::test]
async fn multi_turn_transcript_stays_chronological() {
    let backend = Arc::new(EchoBackend::new());
    let conv = Conversation::new(Arc::clone(&backend), Arc::new(NullObserver));
    conv.start().await.unwrap();
    assert_eq!(
        conv.session_state(),
        SessionState::Active("session-1".to_string())
    );

    assert_eq!(conv.send("one").await, SendOutcome::Sent);
    assert_eq!(conv.send("two").await, SendOutcome::Sent);
    assert_eq!(conv.send("three").await, SendOutcome::Sent);

    assert_eq!(
        conv.transcript(),
        vec![
            Message::user("one"),
            Message::assistant("reply 1 to one"),
            Message::user("two"),
            Message::assistant("reply 2 to two"),
            Message::user("three"),
            Message::assistant("reply 3 to three"),
        ]
    );
}

#[tokio::test]
async fn failed_turn_interleaves_with_healthy_turns() {
    let backend = Arc::new(EchoBackend::new());
    let conv = Conversation::new(Arc::clone(&backend), Arc::new(NullObserver));
    conv.start().await.unwrap();

    conv.send("one").await;
    backend.fail_next(Error::server(503, "overloaded"));
    conv.send("two").await;
    conv.send("three").await;

    let transcript = conv.transcript();
    assert_eq!(transcript.len(), 6);
    assert_eq!(transcript[2], Message::user("two"));
    assert_eq!(transcript[3], Message::assistant(FALLBACK_REPLY));
    // Recovery on the next turn, still in order.
    assert_eq!(transcript[4], Message::user("three"));
    assert_eq!(transcript[5].role, Role::Assistant);
    assert_ne!(transcript[5].text, FALLBACK_REPLY);
}

#[tokio::test]
async fn observer_sees_events_in_commit_order() {
    let backend = Arc::new(EchoBackend::new());
    let observer = Arc::new(RecordingObserver::default());
    let conv = Conversation::new(
        Arc::clone(&backend),
        Arc::clone(&observer) as Arc<dyn TranscriptObserver>,
    );
    conv.start().await.unwrap();

    backend.fail_next(Error::timeout("slow", Some(30.0)));
    conv.send("hello").await;

    assert_eq!(
        observer.events(),
        vec![
            "user: hello".to_string(),
            "pending=true".to_string(),
            "failed=timeout".to_string(),
            format!("assistant: {FALLBACK_REPLY}"),
            "pending=false".to_string(),
        ]
    );
}

#[tokio::test]
async fn concurrent_send_attempts_never_interleave() {
    let backend = Arc::new(EchoBackend::gated());
    let conv = Conversation::new(Arc::clone(&backend), Arc::new(NullObserver));
    conv.start().await.unwrap();

    let sender = conv.clone();
    let first = tokio::spawn(async move { sender.send("a").await });
    while !conv.pending() {
        tokio::task::yield_now().await;
    }

    // Rapid-fire attempts while the first send is in flight all drop.
    assert_eq!(conv.send("b").await, SendOutcome::RejectedBusy);
    assert_eq!(conv.send("c").await, SendOutcome::RejectedBusy);
    assert_eq!(conv.transcript(), vec![Message::user("a")]);

    backend.gate.as_ref().unwrap().notify_one();
    assert_eq!(first.await.unwrap(), SendOutcome::Sent);

    assert_eq!(
        conv.transcript(),
        vec![Message::user("a"), Message::assistant("reply 1 to a")]
    );
    assert!(!conv.pending());
}

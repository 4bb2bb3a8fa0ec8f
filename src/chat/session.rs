//! Core conversation management.
//!
//! This module provides the [`Conversation`] struct which owns the ordered
//! transcript of one conversation, the single-flight send gate, and the
//! per-conversation session lifecycle.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::chat::render::TranscriptObserver;
use crate::client::Otters;
use crate::error::Result;
use crate::observability::{
    CHAT_DROPPED_BUSY, CHAT_DROPPED_EMPTY, CHAT_SEND_FAILURES, CHAT_SENDS,
    SESSION_CREATE_FAILURES,
};
use crate::types::Message;

/// The fixed reply appended to the transcript when a send fails.
///
/// The underlying error never reaches the transcript; it goes to the
/// observer and the failure counters instead.
pub const FALLBACK_REPLY: &str = "Sorry, your message could not be delivered. Please try again.";

/// Backend operations a conversation needs.
///
/// Implemented by [`Otters`] for the real API and by mocks in tests.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Establish a new server-side session, returning its identifier.
    async fn create_session(&self) -> Result<String>;

    /// Deliver one user message, returning the assistant's reply text.
    async fn send_message(&self, message: &str, session_id: Option<&str>) -> Result<String>;
}

#[async_trait::async_trait]
impl ChatBackend for Otters {
    async fn create_session(&self) -> Result<String> {
        Otters::create_session(self).await
    }

    async fn send_message(&self, message: &str, session_id: Option<&str>) -> Result<String> {
        let response = self.send_chat(message, session_id).await?;
        Ok(response.message)
    }
}

/// Lifecycle of a conversation's server-side session.
///
/// A conversation attempts session creation exactly once; `Failed` is a
/// terminal state for that conversation (mount a new one to retry). Sends in
/// any non-`Active` state simply carry no session id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No creation attempt has started yet.
    Uninitialized,
    /// A creation request is in flight.
    Creating,
    /// The session exists; its id accompanies every send.
    Active(String),
    /// Creation failed; the conversation runs without a session.
    Failed,
}

impl SessionState {
    /// The session identifier, when one was established.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            SessionState::Active(id) => Some(id),
            _ => None,
        }
    }

    /// Returns true if a session was established.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }
}

/// State of the voice-capture toggle.
///
/// Capture itself is not implemented; the toggle reserves the interaction
/// point and never affects text sends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordingState {
    /// Not recording.
    #[default]
    Idle,
    /// Recording requested.
    Recording,
}

impl RecordingState {
    /// The opposite state.
    pub fn toggled(self) -> Self {
        match self {
            RecordingState::Idle => RecordingState::Recording,
            RecordingState::Recording => RecordingState::Idle,
        }
    }

    /// Returns true while recording.
    pub fn is_recording(self) -> bool {
        matches!(self, RecordingState::Recording)
    }
}

/// The result of a [`Conversation::send`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was committed to the transcript and a reply (or the
    /// fallback) was appended.
    Sent,
    /// The input was empty after trimming; nothing happened.
    RejectedEmpty,
    /// Another send was already in flight; nothing happened.
    RejectedBusy,
}

#[derive(Debug)]
struct ConversationInner {
    transcript: Vec<Message>,
    pending: bool,
    session: SessionState,
    recording: RecordingState,
}

/// A snapshot of conversation state for display.
#[derive(Clone, Debug)]
pub struct ConversationStats {
    /// The session lifecycle state.
    pub session: SessionState,
    /// Number of transcript messages.
    pub message_count: usize,
    /// Whether a send is in flight.
    pub pending: bool,
    /// The voice-capture toggle state.
    pub recording: RecordingState,
}

/// One conversation with the assistant.
///
/// The transcript is append-only and its order always matches submission
/// order: the user message is appended synchronously before the network call
/// starts, and at most one send is in flight at a time. Handles are cheap to
/// clone and share one underlying conversation. The internal lock is never
/// held across an await.
pub struct Conversation<B: ChatBackend> {
    backend: Arc<B>,
    observer: Arc<dyn TranscriptObserver>,
    inner: Arc<Mutex<ConversationInner>>,
}

impl<B: ChatBackend> Clone for Conversation<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            observer: Arc::clone(&self.observer),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: ChatBackend> Conversation<B> {
    /// Creates a new conversation over the given backend.
    ///
    /// Call [`Conversation::start`] afterwards to establish the session.
    pub fn new(backend: Arc<B>, observer: Arc<dyn TranscriptObserver>) -> Self {
        Self {
            backend,
            observer,
            inner: Arc::new(Mutex::new(ConversationInner {
                transcript: Vec::new(),
                pending: false,
                session: SessionState::Uninitialized,
                recording: RecordingState::Idle,
            })),
        }
    }

    /// Establishes the server-side session for this conversation.
    ///
    /// Runs at most once per conversation; later calls are no-ops. On failure
    /// the conversation stays usable: sends proceed with no session id, and
    /// the error is reported to the observer and returned so the caller can
    /// warn. Retrying requires mounting a fresh conversation.
    pub async fn start(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.session != SessionState::Uninitialized {
                return Ok(());
            }
            inner.session = SessionState::Creating;
        }

        match self.backend.create_session().await {
            Ok(id) => {
                self.lock().session = SessionState::Active(id);
                Ok(())
            }
            Err(err) => {
                SESSION_CREATE_FAILURES.click();
                self.lock().session = SessionState::Failed;
                self.observer.session_failed(&err);
                Err(err)
            }
        }
    }

    /// Sends a user message and appends the reply to the transcript.
    ///
    /// The trimmed message is appended to the transcript before the network
    /// call begins, so the user's input is visible even if the send fails.
    /// Empty input and sends attempted while another is in flight are
    /// rejected without touching the transcript or the network; both are
    /// deliberate guards, not errors. Any backend failure yields the fixed
    /// [`FALLBACK_REPLY`] instead; the error kind goes to the observer. The
    /// pending flag clears unconditionally when the attempt completes.
    pub async fn send(&self, input: &str) -> SendOutcome {
        let text = input.trim();
        if text.is_empty() {
            CHAT_DROPPED_EMPTY.click();
            return SendOutcome::RejectedEmpty;
        }

        let (user_message, session_id) = {
            let mut inner = self.lock();
            if inner.pending {
                CHAT_DROPPED_BUSY.click();
                return SendOutcome::RejectedBusy;
            }
            let message = Message::user(text);
            inner.transcript.push(message.clone());
            inner.pending = true;
            (message, inner.session.session_id().map(String::from))
        };
        self.observer.message_appended(&user_message);
        self.observer.pending_changed(true);
        CHAT_SENDS.click();

        let result = self.backend.send_message(text, session_id.as_deref()).await;

        let reply = match result {
            Ok(reply) => Message::assistant(reply),
            Err(err) => {
                CHAT_SEND_FAILURES.click();
                self.observer.send_failed(&err);
                Message::assistant(FALLBACK_REPLY)
            }
        };
        {
            let mut inner = self.lock();
            inner.transcript.push(reply.clone());
            inner.pending = false;
        }
        self.observer.message_appended(&reply);
        self.observer.pending_changed(false);
        SendOutcome::Sent
    }

    /// Flips the voice-capture toggle and returns the new state.
    pub fn toggle_recording(&self) -> RecordingState {
        let mut inner = self.lock();
        inner.recording = inner.recording.toggled();
        inner.recording
    }

    /// The current voice-capture toggle state.
    pub fn recording(&self) -> RecordingState {
        self.lock().recording
    }

    /// A snapshot of the transcript.
    pub fn transcript(&self) -> Vec<Message> {
        self.lock().transcript.clone()
    }

    /// The number of messages in the transcript.
    pub fn message_count(&self) -> usize {
        self.lock().transcript.len()
    }

    /// Whether a send is in flight.
    pub fn pending(&self) -> bool {
        self.lock().pending
    }

    /// The session lifecycle state.
    pub fn session_state(&self) -> SessionState {
        self.lock().session.clone()
    }

    /// A snapshot of conversation state for display.
    pub fn stats(&self) -> ConversationStats {
        let inner = self.lock();
        ConversationStats {
            session: inner.session.clone(),
            message_count: inner.transcript.len(),
            pending: inner.pending,
            recording: inner.recording,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConversationInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//! Presentation seam for conversation state.
//!
//! The engine never prints anything itself; it reports transcript and
//! pending-state changes through the [`TranscriptObserver`] trait so the
//! presentation layer stays decoupled from the engine's invariants.

use crate::error::Error;
use crate::types::{Message, Role};

/// ANSI escape code for dim text.
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Observer of conversation state changes.
///
/// All methods have no-op defaults so implementations only handle the events
/// they care about. Errors delivered here were already converted into the
/// user-visible fallback by the engine; observers receive the underlying
/// kind for diagnostics only.
pub trait TranscriptObserver: Send + Sync {
    /// A message was appended to the transcript.
    fn message_appended(&self, message: &Message) {
        let _ = message;
    }

    /// The in-flight send state changed.
    fn pending_changed(&self, pending: bool) {
        let _ = pending;
    }

    /// A send failed; the transcript already carries the fallback reply.
    fn send_failed(&self, error: &Error) {
        let _ = error;
    }

    /// Session creation failed; the conversation continues without a session.
    fn session_failed(&self, error: &Error) {
        let _ = error;
    }
}

/// An observer that discards all events.
pub struct NullObserver;

impl TranscriptObserver for NullObserver {}

/// An observer that prints assistant replies and diagnostics to the terminal.
pub struct PlainTextObserver {
    use_color: bool,
}

impl PlainTextObserver {
    /// Creates an observer with color output enabled.
    pub fn new() -> Self {
        Self { use_color: true }
    }

    /// Creates an observer with color output controlled by the caller.
    pub fn with_color(use_color: bool) -> Self {
        Self { use_color }
    }

    /// Print an informational message.
    pub fn print_info(&self, message: &str) {
        if self.use_color {
            println!("{ANSI_DIM}{message}{ANSI_RESET}");
        } else {
            println!("{message}");
        }
    }

    /// Print an error message to stderr.
    pub fn print_error(&self, message: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}{message}{ANSI_RESET}");
        } else {
            eprintln!("{message}");
        }
    }
}

impl Default for PlainTextObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptObserver for PlainTextObserver {
    fn message_appended(&self, message: &Message) {
        // The user sees their own input as they type it; only echo replies.
        if message.role == Role::Assistant {
            println!("Otters: {}", message.text);
        }
    }

    fn send_failed(&self, error: &Error) {
        self.print_error(&format!("send failed ({}): {}", error.kind(), error));
    }

    fn session_failed(&self, error: &Error) {
        self.print_error(&format!(
            "session setup failed ({}): {}; continuing without a session",
            error.kind(),
            error
        ));
    }
}

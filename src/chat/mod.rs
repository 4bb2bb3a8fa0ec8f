//! Chat application module for conversations with the Otters assistant.
//!
//! This module provides a REPL chat interface built on top of the otters
//! client library. It supports:
//!
//! - A per-conversation session established at mount
//! - Optimistic transcript updates with a single-flight send gate
//! - Slash commands for session control and diary entries
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - `config`: CLI argument parsing and configuration
//! - `session`: Conversation state, session lifecycle, and sends
//! - `commands`: Slash command parsing and handling
//! - `render`: The observer seam between engine and presentation

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{NullObserver, PlainTextObserver, TranscriptObserver};
pub use session::{
    ChatBackend, Conversation, ConversationStats, FALLBACK_REPLY, RecordingState, SendOutcome,
    SessionState,
};

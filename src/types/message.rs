use std::fmt;

use serde::{Deserialize, Serialize};

/// The author of a transcript message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message typed by the user.
    User,
    /// A reply from the assistant (including the local fallback reply).
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry in a conversation transcript.
///
/// Messages are immutable once appended; the transcript only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,
    /// The message text.
    pub text: String,
}

impl Message {
    /// Creates a user message.
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn constructors() {
        let msg = Message::user("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text, "hello");

        let msg = Message::assistant("hi there");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.text, "hi there");
    }
}

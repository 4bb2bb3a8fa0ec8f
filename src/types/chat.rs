use serde::{Deserialize, Serialize};

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// The user's message text, already trimmed.
    pub message: String,
    /// The session scoping this exchange. Serialized as `null` when the
    /// session was never established; the server then assigns one itself.
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// Creates a new chat request.
    pub fn new<S: Into<String>>(message: S, session_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            session_id,
        }
    }
}

/// Response body for `POST /api/chat`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    /// The assistant's reply.
    pub message: String,
    /// The session the server recorded the exchange under.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response body for `POST /api/chat/new-session`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NewSessionResponse {
    /// The freshly minted session identifier.
    pub session_id: String,
}

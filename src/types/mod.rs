// Public modules
pub mod auth;
pub mod chat;
pub mod diary;
pub mod message;

// Re-exports
pub use auth::{GoogleAuthRequest, TokenResponse};
pub use chat::{ChatRequest, ChatResponse, NewSessionResponse};
pub use diary::DiaryParams;
pub use message::{Message, Role};

// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod observability;
pub mod token;
pub mod types;

// Re-exports
pub use client::Otters;
pub use error::{Error, Result};
pub use token::{TokenPair, TokenStore};
pub use types::*;

//! Billing chat agent.
//!
//! - [`CompletionClient`]: question + context to answer, with model fallback
//!   and self-healing default selection
//! - [`ChatSession`]: transcript, per-turn context, in-flight guard, and the
//!   [`ChatEvent`] stream a view subscribes to
//! - [`prompt`]: system instructions and prompt layout

pub mod completion_client;
pub mod error_handler;
pub mod prompt;
pub mod session;

#[cfg(test)]
mod testing;

pub use completion_client::{Completion, CompletionClient};
pub use error_handler::{CREDENTIAL_HELP_URL, ChatError};
pub use session::{ChatEvent, ChatMessage, ChatSession, Role};

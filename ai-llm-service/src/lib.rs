//! Gemini generative-language client for the billing assistant.
//!
//! - [`services::gemini_service::GeminiService`]: discovery + single-turn generation
//! - [`services::GenerativeBackend`]: the seam the chat layer depends on
//! - [`model_selection`]: candidate ordering and sequential fallback
//! - [`credential_check`]: list-vs-generate permission probe
//! - [`error_handler`]: unified error taxonomy and env helpers
//! - [`telemetry`]: log layer used by the binary

pub mod config {
    pub mod default_config;
    pub mod llm_model_config;
}
pub mod credential_check;
pub mod error_handler;
pub mod model_selection;
pub mod services;
pub mod telemetry;

pub use config::llm_model_config::GeminiConfig;
pub use credential_check::{CredentialOutcome, CredentialReport, CredentialValidator, VerifiedCredential};
pub use error_handler::{AiLlmError, ErrorKind, HttpError};
pub use model_selection::{Selected, candidate_models, select_working_model};
pub use services::{GenerativeBackend, gemini_service::GeminiService};

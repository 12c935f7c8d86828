//! Backend seam for generative-language providers.

use async_trait::async_trait;

use crate::error_handler::AiLlmError;

pub mod gemini_service;

/// Operations the chat layer needs from a remote model provider.
///
/// [`gemini_service::GeminiService`] is the production implementation; tests
/// substitute in-memory fakes.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Single-turn generation of `prompt` with `model`, authorized by `credential`.
    async fn generate(&self, credential: &str, model: &str, prompt: &str) -> Result<String, AiLlmError>;

    /// Bare identifiers of the models that support single-turn generation.
    async fn list_generation_models(&self, credential: &str) -> Result<Vec<String>, AiLlmError>;
}

use ai_llm_service::{AiLlmError, ErrorKind};
use settings_store::errors::SettingsError;
use thiserror::Error;

/// Where a new Gemini key can be created.
pub const CREDENTIAL_HELP_URL: &str = "https://aistudio.google.com/app/apikey";

/// Public chat error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No credential is stored; the user must configure one first.
    #[error("[Chat Agent] no API credential configured")]
    ConfigurationRequired,

    /// A previous question is still being answered.
    #[error("[Chat Agent] a request is already in flight")]
    Busy,

    #[error(transparent)]
    Llm(#[from] AiLlmError),

    #[error("[Chat Agent] settings error: {0}")]
    Settings(#[from] SettingsError),
}

impl ChatError {
    /// Text shown in the chat thread for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::ConfigurationRequired => {
                "No API key configured. Run `billing-assistant settings set-key <KEY>` or use /settings.".to_string()
            }
            ChatError::Busy => "Still answering the previous question, please wait.".to_string(),
            ChatError::Settings(e) => format!("Could not access local settings: {e}"),
            ChatError::Llm(e) => llm_message(e),
        }
    }
}

fn llm_message(e: &AiLlmError) -> String {
    match e.kind() {
        ErrorKind::InvalidCredential => format!(
            "Your API key is invalid or expired. Create a new one at {CREDENTIAL_HELP_URL} and update it in settings."
        ),
        ErrorKind::Permission => {
            "Your API key can list models but is not allowed to generate content. Enable the Generative Language API for this key's project.".to_string()
        }
        ErrorKind::QuotaExceeded => {
            "Gemini quota exceeded (429). This is temporary, try again in a minute.".to_string()
        }
        ErrorKind::ModelUnavailable => {
            "Could not reach any Gemini model. Check the model list in settings.".to_string()
        }
        ErrorKind::Connectivity => {
            "Connection to Gemini failed. Check your network and try again.".to_string()
        }
        ErrorKind::Other => format!("Gemini request failed: {e}"),
    }
}

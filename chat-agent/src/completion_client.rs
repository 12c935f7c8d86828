//! Completion with self-healing model selection.
//!
//! Each question is tried against `[current model] ++ fallbacks` strictly in
//! order. The first model that answers becomes the stored default when it
//! differs from the current one, so later turns (and later sessions) start
//! with a model known to work for this credential.

use std::sync::{Arc, RwLock};

use ai_llm_service::{
    CredentialReport, CredentialValidator, GeminiConfig, GenerativeBackend, VerifiedCredential,
    config::llm_model_config::LEGACY_MODELS,
    error_handler::ConfigError,
    model_selection::{bare_model_id, candidate_models, select_working_model},
};
use serde::Serialize;
use settings_store::{CREDENTIAL_KEY, MODEL_KEY, SettingsStore};
use tracing::{info, instrument, warn};

use crate::{
    error_handler::ChatError,
    prompt::{SYSTEM_PROMPT, compose},
};

/// A successful answer and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub answer: String,
    /// Model that produced `answer`.
    pub model: String,
    /// Whether `model` replaced the previous default.
    pub promoted: bool,
    /// Network calls made, including the successful one.
    pub attempts: usize,
}

pub struct CompletionClient {
    backend: Arc<dyn GenerativeBackend>,
    store: Arc<dyn SettingsStore>,
    cfg: GeminiConfig,
    current_model: RwLock<String>,
}

impl CompletionClient {
    /// Creates the client and loads the stored model.
    ///
    /// A stored `models/` prefix is stripped. A missing or legacy stored model
    /// is replaced by `cfg.default_model`. Any change is written back.
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        store: Arc<dyn SettingsStore>,
        cfg: GeminiConfig,
    ) -> Result<Self, ChatError> {
        let stored = store.get(MODEL_KEY)?;
        let model = migrate_stored_model(stored.as_deref(), &cfg.default_model);
        if stored.as_deref() != Some(model.as_str()) {
            info!(from = ?stored, to = %model, "migrating stored model");
            store.set(MODEL_KEY, &model)?;
        }

        Ok(Self {
            backend,
            store,
            cfg,
            current_model: RwLock::new(model),
        })
    }

    /// The model tried first on the next question.
    pub fn current_model(&self) -> String {
        self.current_model
            .read()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.cfg
    }

    /// Whether a non-blank credential is stored.
    pub fn has_credential(&self) -> Result<bool, ChatError> {
        Ok(self.credential()?.is_some())
    }

    fn credential(&self) -> Result<Option<String>, ChatError> {
        Ok(self
            .store
            .get(CREDENTIAL_KEY)?
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty()))
    }

    fn require_credential(&self) -> Result<String, ChatError> {
        self.credential()?.ok_or(ChatError::ConfigurationRequired)
    }

    /// Makes `model` the current default and persists it.
    fn adopt_model(&self, model: &str) -> Result<(), ChatError> {
        self.store.set(MODEL_KEY, model)?;
        match self.current_model.write() {
            Ok(mut m) => *m = model.to_string(),
            Err(poisoned) => *poisoned.into_inner() = model.to_string(),
        }
        Ok(())
    }

    /// Answers `question` given the serialized `context`.
    ///
    /// # Errors
    /// - [`ChatError::ConfigurationRequired`] without any network call when no
    ///   credential is stored
    /// - the last candidate's error when every candidate fails
    #[instrument(skip_all, fields(question_len = question.len(), context_len = context.len()))]
    pub async fn complete(&self, question: &str, context: &str) -> Result<Completion, ChatError> {
        let credential = self.require_credential()?;
        let current = self.current_model();
        let candidates = candidate_models(Some(current.as_str()), &self.cfg.fallback_models);
        let prompt = compose(SYSTEM_PROMPT, context, question);

        let backend = &self.backend;
        let (credential, prompt) = (credential.as_str(), prompt.as_str());
        let selected = select_working_model(&candidates, move |model| async move {
            backend.generate(credential, &model, prompt).await
        })
        .await?;

        let promoted = selected.model != current;
        if promoted {
            info!(from = %current, to = %selected.model, "promoting working model to default");
            // Not fatal: the answer is returned either way.
            if let Err(err) = self.adopt_model(&selected.model) {
                warn!(error = %err, "failed to persist promoted model");
            }
        }

        Ok(Completion {
            answer: selected.value,
            model: selected.model,
            promoted,
            attempts: selected.attempts,
        })
    }

    fn validator(&self) -> CredentialValidator {
        CredentialValidator::new(Arc::clone(&self.backend), &self.cfg.fallback_models)
    }

    /// Checks `credential` without storing anything.
    pub async fn validate_credential(&self, credential: &str) -> Result<VerifiedCredential, ChatError> {
        let current = self.current_model();
        Ok(self.validator().try_validate(credential, Some(current.as_str())).await?)
    }

    /// Resilient variant of [`Self::validate_credential`] for status displays.
    pub async fn check_credential(&self, credential: &str) -> CredentialReport {
        let current = self.current_model();
        self.validator().check(credential, Some(current.as_str())).await
    }

    /// Resilient check of the stored credential.
    pub async fn check_stored_credential(&self) -> Result<CredentialReport, ChatError> {
        let credential = self.require_credential()?;
        Ok(self.check_credential(&credential).await)
    }

    /// Validates `credential` and, only on success, stores it together with
    /// the verified model.
    pub async fn configure(&self, credential: &str) -> Result<VerifiedCredential, ChatError> {
        let credential = credential.trim();
        let verified = self.validate_credential(credential).await?;
        self.store.set(CREDENTIAL_KEY, credential)?;
        self.adopt_model(&verified.model)?;
        info!(model = %verified.model, "credential configured");
        Ok(verified)
    }

    /// Re-validates the stored credential and adopts the verified model.
    pub async fn revalidate(&self) -> Result<VerifiedCredential, ChatError> {
        let credential = self.require_credential()?;
        let verified = self.validate_credential(&credential).await?;
        if verified.model != self.current_model() {
            self.adopt_model(&verified.model)?;
        }
        Ok(verified)
    }

    /// Generation-capable models visible to the stored credential.
    pub async fn available_models(&self) -> Result<Vec<String>, ChatError> {
        let credential = self.require_credential()?;
        Ok(self.backend.list_generation_models(&credential).await?)
    }

    /// Persists a manual model choice.
    pub fn select_model(&self, model: &str) -> Result<String, ChatError> {
        let model = bare_model_id(model);
        if model.is_empty() {
            return Err(ai_llm_service::AiLlmError::from(ConfigError::EmptyModel).into());
        }
        self.adopt_model(model)?;
        Ok(model.to_string())
    }

    /// Forgets the stored credential.
    pub fn clear_credential(&self) -> Result<(), ChatError> {
        self.store.remove(CREDENTIAL_KEY)?;
        Ok(())
    }
}

fn migrate_stored_model(stored: Option<&str>, default_model: &str) -> String {
    match stored.map(bare_model_id) {
        Some(m) if !m.is_empty() && !LEGACY_MODELS.contains(&m) => m.to_string(),
        _ => bare_model_id(default_model).to_string(),
    }
}

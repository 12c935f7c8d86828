//! Fake backend shared by the unit tests.

use std::sync::{Arc, Mutex};

use ai_llm_service::{AiLlmError, GenerativeBackend, HttpError};
use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Notify;

type Answer = dyn Fn(&str) -> Result<String, AiLlmError> + Send + Sync;

pub(crate) fn http(status: u16) -> HttpError {
    HttpError {
        status: StatusCode::from_u16(status).unwrap(),
        url: "https://example.test/v1beta/models".into(),
        message: "scripted".into(),
    }
}

/// Answers per model via a closure and records every generate call.
pub(crate) struct ScriptedBackend {
    answer: Box<Answer>,
    models: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedBackend {
    pub(crate) fn answering(
        f: impl Fn(&str) -> Result<String, AiLlmError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            answer: Box::new(f),
            models: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        })
    }

    pub(crate) fn with_models(self: Arc<Self>, models: Vec<String>) -> Arc<Self> {
        *self.models.lock().unwrap() = models;
        self
    }

    /// Every generate call waits for `gate.notify_one()` before answering.
    pub(crate) fn with_gate(self: Arc<Self>, gate: Arc<Notify>) -> Arc<Self> {
        *self.gate.lock().unwrap() = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, _credential: &str, model: &str, _prompt: &str) -> Result<String, AiLlmError> {
        self.calls.lock().unwrap().push(model.to_string());
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        (self.answer)(model)
    }

    async fn list_generation_models(&self, _credential: &str) -> Result<Vec<String>, AiLlmError> {
        Ok(self.models.lock().unwrap().clone())
    }
}

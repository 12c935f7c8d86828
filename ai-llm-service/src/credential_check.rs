//! Credential validation for the Gemini backend.
//!
//! Listing models and generating content are separate permissions on the
//! Generative Language API: a key can succeed at discovery and still be
//! refused at generation. The check therefore runs two probes:
//! - discovery: which models does this key see (filtered to `generateContent`)
//! - diagnostic: one tiny generation against the chosen model
//!
//! [`CredentialValidator::check`] is resilient and never fails (errors are
//! mapped into the report). [`CredentialValidator::try_validate`] returns a
//! strict `Result`.

use std::{sync::Arc, time::Instant};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    error_handler::{AiLlmError, ErrorKind},
    model_selection::{bare_model_id, dedup_preserving_order},
    services::GenerativeBackend,
};

/// Prompt used for the write-permission probe.
const DIAGNOSTIC_PROMPT: &str = "Hello";

/// A credential that passed both probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedCredential {
    /// Model that answered the diagnostic generation.
    pub model: String,
    /// Generation-capable models visible to the credential.
    pub available_models: Vec<String>,
    /// Total latency of both probes in milliseconds.
    pub latency_ms: u128,
}

/// Result bucket of a credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialOutcome {
    Verified,
    ConnectivityError,
    InvalidCredential,
    PermissionDenied,
    QuotaExceeded,
}

impl CredentialOutcome {
    fn from_error(err: &AiLlmError) -> Self {
        match err.kind() {
            ErrorKind::InvalidCredential => CredentialOutcome::InvalidCredential,
            ErrorKind::Permission => CredentialOutcome::PermissionDenied,
            ErrorKind::QuotaExceeded => CredentialOutcome::QuotaExceeded,
            ErrorKind::Connectivity | ErrorKind::ModelUnavailable | ErrorKind::Other => {
                CredentialOutcome::ConnectivityError
            }
        }
    }
}

/// A serializable snapshot of one credential check.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialReport {
    /// What the check concluded.
    pub outcome: CredentialOutcome,
    /// Verified model (only when `outcome` is `Verified`).
    pub model: Option<String>,
    /// Models discovered before the diagnostic probe, if discovery succeeded.
    pub available_models: Vec<String>,
    /// Measured latency in milliseconds.
    pub latency_ms: u128,
    /// Short human-readable message with details.
    pub message: String,
}

impl CredentialReport {
    /// Whether the credential can generate content.
    pub fn is_verified(&self) -> bool {
        self.outcome == CredentialOutcome::Verified
    }
}

/// Runs discovery + diagnostic probes against a [`GenerativeBackend`].
pub struct CredentialValidator {
    backend: Arc<dyn GenerativeBackend>,
    default_models: Vec<String>,
}

impl CredentialValidator {
    /// Creates a validator.
    ///
    /// `default_models` stand in for discovery when the key sees no
    /// generation-capable models.
    pub fn new<S: AsRef<str>>(backend: Arc<dyn GenerativeBackend>, default_models: &[S]) -> Self {
        Self {
            backend,
            default_models: dedup_preserving_order(default_models.iter().map(|m| bare_model_id(m.as_ref()))),
        }
    }

    /// Strict validation.
    ///
    /// Picks `preferred` when discovery lists it, otherwise the first
    /// discovered model, then runs one diagnostic generation with it.
    ///
    /// # Errors
    /// - [`AiLlmError::MissingCredential`] for a blank credential
    /// - discovery errors as classified by the backend
    /// - [`AiLlmError::Permission`] when the key lists models but cannot generate
    /// - [`AiLlmError::QuotaExceeded`] when the diagnostic call is rate limited
    /// - any other diagnostic failure unchanged
    #[instrument(skip_all, fields(preferred = preferred.unwrap_or("n/a")))]
    pub async fn try_validate(
        &self,
        credential: &str,
        preferred: Option<&str>,
    ) -> Result<VerifiedCredential, AiLlmError> {
        if credential.trim().is_empty() {
            return Err(AiLlmError::MissingCredential);
        }
        let start = Instant::now();

        let mut available = self.backend.list_generation_models(credential).await?;
        if available.is_empty() {
            warn!("discovery returned no generation models; using built-in defaults");
            available = self.default_models.clone();
        }
        let available = dedup_preserving_order(available);

        let model = preferred
            .map(bare_model_id)
            .filter(|p| available.iter().any(|m| m.as_str() == *p))
            .map(str::to_string)
            .or_else(|| available.first().cloned())
            .ok_or(AiLlmError::NoModelCandidates)?;

        debug!(model = %model, discovered = available.len(), "running diagnostic generation");

        // Discovery already accepted the key, so a 400/401 here is a missing
        // generation permission rather than a bad key.
        if let Err(err) = self.backend.generate(credential, &model, DIAGNOSTIC_PROMPT).await {
            return Err(match err {
                AiLlmError::InvalidCredential(h) => AiLlmError::Permission(h),
                AiLlmError::Upstream(h) if h.status.as_u16() == 400 => AiLlmError::Permission(h),
                other => other,
            });
        }

        let latency_ms = start.elapsed().as_millis();
        info!(model = %model, latency_ms, "credential verified");

        Ok(VerifiedCredential {
            model,
            available_models: available,
            latency_ms,
        })
    }

    /// Resilient validation: never returns an error.
    pub async fn check(&self, credential: &str, preferred: Option<&str>) -> CredentialReport {
        let start = Instant::now();
        match self.try_validate(credential, preferred).await {
            Ok(v) => CredentialReport {
                outcome: CredentialOutcome::Verified,
                message: format!("credential verified with model {}", v.model),
                model: Some(v.model),
                available_models: v.available_models,
                latency_ms: v.latency_ms,
            },
            Err(err) => {
                let outcome = CredentialOutcome::from_error(&err);
                warn!(outcome = ?outcome, error = %err, "credential check failed");
                CredentialReport {
                    outcome,
                    model: None,
                    available_models: Vec::new(),
                    latency_ms: start.elapsed().as_millis(),
                    message: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::HttpError;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    fn http(status: u16) -> HttpError {
        HttpError {
            status: StatusCode::from_u16(status).unwrap(),
            url: "https://x/v1beta/models".into(),
            message: "boom".into(),
        }
    }

    /// Discovery and generation results are scripted; generate calls are recorded.
    struct ScriptedBackend {
        listed: Mutex<Option<Result<Vec<String>, AiLlmError>>>,
        generated: Mutex<Option<Result<String, AiLlmError>>>,
        generate_calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(
            listed: Result<Vec<String>, AiLlmError>,
            generated: Result<String, AiLlmError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                listed: Mutex::new(Some(listed)),
                generated: Mutex::new(Some(generated)),
                generate_calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn generate(&self, _c: &str, model: &str, _p: &str) -> Result<String, AiLlmError> {
            self.generate_calls.lock().unwrap().push(model.to_string());
            self.generated.lock().unwrap().take().unwrap()
        }

        async fn list_generation_models(&self, _c: &str) -> Result<Vec<String>, AiLlmError> {
            self.listed.lock().unwrap().take().unwrap()
        }
    }

    fn validator(backend: Arc<ScriptedBackend>) -> CredentialValidator {
        CredentialValidator::new(backend, &["gemini-1.5-flash", "gemini-1.5-pro"])
    }

    #[tokio::test]
    async fn prefers_requested_model_when_discovered() {
        let backend = ScriptedBackend::new(
            Ok(vec!["gemini-1.5-flash".into(), "gemini-1.5-pro".into()]),
            Ok("hi".into()),
        );
        let v = validator(backend.clone())
            .try_validate("k", Some("models/gemini-1.5-pro"))
            .await
            .unwrap();
        assert_eq!(v.model, "gemini-1.5-pro");
        assert_eq!(*backend.generate_calls.lock().unwrap(), vec!["gemini-1.5-pro"]);
    }

    #[tokio::test]
    async fn falls_back_to_first_discovered_model() {
        let backend = ScriptedBackend::new(Ok(vec!["gemini-2.0-flash".into()]), Ok("hi".into()));
        let v = validator(backend).try_validate("k", Some("gemini-pro")).await.unwrap();
        assert_eq!(v.model, "gemini-2.0-flash");
        assert_eq!(v.available_models, vec!["gemini-2.0-flash"]);
    }

    #[tokio::test]
    async fn empty_discovery_uses_defaults() {
        let backend = ScriptedBackend::new(Ok(vec![]), Ok("hi".into()));
        let v = validator(backend).try_validate("k", None).await.unwrap();
        assert_eq!(v.model, "gemini-1.5-flash");
        assert_eq!(v.available_models.len(), 2);
    }

    #[tokio::test]
    async fn listing_ok_but_generation_refused_is_permission() {
        let backend = ScriptedBackend::new(
            Ok(vec!["gemini-1.5-flash".into()]),
            Err(AiLlmError::Permission(http(403))),
        );
        let report = validator(backend).check("k", None).await;
        assert_eq!(report.outcome, CredentialOutcome::PermissionDenied);
        assert!(!report.is_verified());

        let backend = ScriptedBackend::new(
            Ok(vec!["gemini-1.5-flash".into()]),
            Err(AiLlmError::Upstream(http(400))),
        );
        let err = validator(backend).try_validate("k", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[tokio::test]
    async fn report_buckets() {
        let cases: [(Result<Vec<String>, AiLlmError>, CredentialOutcome); 3] = [
            (Err(AiLlmError::InvalidCredential(http(400))), CredentialOutcome::InvalidCredential),
            (Err(AiLlmError::QuotaExceeded(http(429))), CredentialOutcome::QuotaExceeded),
            (Err(AiLlmError::Upstream(http(503))), CredentialOutcome::ConnectivityError),
        ];
        for (listed, expected) in cases {
            let backend = ScriptedBackend::new(listed, Ok("unused".into()));
            let report = validator(backend.clone()).check("k", None).await;
            assert_eq!(report.outcome, expected);
            assert!(backend.generate_calls.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn quota_on_diagnostic_is_reported() {
        let backend = ScriptedBackend::new(
            Ok(vec!["gemini-1.5-flash".into()]),
            Err(AiLlmError::QuotaExceeded(http(429))),
        );
        let report = validator(backend).check("k", None).await;
        assert_eq!(report.outcome, CredentialOutcome::QuotaExceeded);
    }

    #[tokio::test]
    async fn blank_credential_is_rejected_without_calls() {
        let backend = ScriptedBackend::new(Ok(vec![]), Ok("unused".into()));
        let report = validator(backend.clone()).check("", None).await;
        assert_eq!(report.outcome, CredentialOutcome::InvalidCredential);
        assert!(backend.generate_calls.lock().unwrap().is_empty());
    }
}

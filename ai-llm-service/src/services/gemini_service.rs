//! Gemini (Generative Language API) service for text generation and model discovery.
//!
//! Minimal, non-streaming client around the REST API. Endpoints are derived
//! from `GeminiConfig::endpoint` and `GeminiConfig::api_version`:
//! - GET  {endpoint}/{version}/models                       — model discovery
//! - POST {endpoint}/{version}/models/{model}:generateContent — single-turn generation
//!
//! The credential is sent as the `key` query parameter. It is never written to
//! logs or stored in errors: request URLs kept for diagnostics are built
//! without the query string, and transport errors are stripped of their URL.
//!
//! Errors are normalized via the taxonomy in `error_handler`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::{
    config::llm_model_config::GeminiConfig,
    error_handler::{
        AiLlmError, HttpError, classify_discovery_failure, classify_generation_failure,
        upstream_message,
    },
    model_selection::bare_model_id,
    services::GenerativeBackend,
};

/// Generation method a model must advertise to be usable for chat.
pub const GENERATE_CONTENT: &str = "generateContent";

/// A model entry from the discovery endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Bare model identifier (no `models/` prefix).
    pub name: String,
    /// Human-readable name, when the API provides one.
    pub display_name: Option<String>,
    /// Generation methods the model supports (e.g. `generateContent`).
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Whether the model can serve single-turn `generateContent` calls.
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_CONTENT)
    }
}

/// Thin client for the Gemini REST API.
///
/// Constructed from a complete [`GeminiConfig`]. Internally keeps one
/// preconfigured `reqwest::Client` (timeout + default headers).
///
/// High-level operations:
/// - [`GeminiService::generate`]    — single, non-streaming generation
/// - [`GeminiService::list_models`] — model discovery for a credential
#[derive(Debug)]
pub struct GeminiService {
    client: reqwest::Client,
    cfg: GeminiConfig,
    base: String,
}

impl GeminiService {
    /// Creates a new [`GeminiService`] from the given config.
    ///
    /// # Errors
    /// - [`AiLlmError::Config`] if `cfg.endpoint` is empty or not http/https
    /// - [`AiLlmError::HttpClient`] if the HTTP client cannot be built
    pub fn new(cfg: GeminiConfig) -> Result<Self, AiLlmError> {
        let endpoint = cfg.endpoint.trim();
        crate::error_handler::validate_http_endpoint("GEMINI_ENDPOINT", endpoint)?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(AiLlmError::HttpClient)?;

        let base = format!(
            "{}/{}",
            endpoint.trim_end_matches('/'),
            cfg.api_version.trim_matches('/')
        );

        info!(
            endpoint = %cfg.endpoint,
            api_version = %cfg.api_version,
            timeout_secs = timeout.as_secs(),
            "GeminiService initialized"
        );

        Ok(Self { client, cfg, base })
    }

    /// Returns the config this service was built from.
    pub fn config(&self) -> &GeminiConfig {
        &self.cfg
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base)
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base, bare_model_id(model))
    }

    /// Performs a **non-streaming** single-turn generation.
    ///
    /// The request body carries one content with one text part.
    ///
    /// # Errors
    /// - [`AiLlmError::MissingCredential`] if `credential` is blank
    /// - [`AiLlmError::Connectivity`] for client/network failures
    /// - taxonomy variants (see `classify_generation_failure`) for non-2xx responses
    /// - [`AiLlmError::Decode`] if the JSON cannot be parsed
    /// - [`AiLlmError::EmptyCandidates`] if no candidate text is returned
    #[instrument(skip_all, fields(model = %bare_model_id(model), prompt_len = prompt.len()))]
    pub async fn generate(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, AiLlmError> {
        if credential.trim().is_empty() {
            return Err(AiLlmError::MissingCredential);
        }
        let model = bare_model_id(model);
        let url = self.generate_url(model);
        let started = Instant::now();
        let body = GenerateContentRequest::single_turn(prompt);

        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", credential)])
            .json(&body)
            .send()
            .await
            .map_err(AiLlmError::connectivity)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let message = upstream_message(&text);

            error!(
                %status,
                %url,
                %message,
                latency_ms = started.elapsed().as_millis(),
                "generateContent returned non-success status"
            );

            return Err(classify_generation_failure(
                model,
                HttpError {
                    status,
                    url,
                    message,
                },
            ));
        }

        let out: GenerateContentResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                let e = e.without_url();
                error!(
                    error = %e,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode generateContent response"
                );
                return Err(AiLlmError::Decode(format!(
                    "serde error: {e}; expected `candidates[0].content.parts[0].text`"
                )));
            }
        };

        let text = out.first_text().ok_or_else(|| AiLlmError::EmptyCandidates {
            model: model.to_string(),
        })?;

        info!(
            latency_ms = started.elapsed().as_millis(),
            answer_len = text.len(),
            "generation completed"
        );

        Ok(text)
    }

    /// Lists models visible to `credential`.
    ///
    /// # Errors
    /// - [`AiLlmError::MissingCredential`] if `credential` is blank
    /// - [`AiLlmError::Connectivity`] for client/network failures
    /// - taxonomy variants (see `classify_discovery_failure`) for non-2xx responses
    /// - [`AiLlmError::Decode`] if the JSON cannot be parsed
    #[instrument(skip_all)]
    pub async fn list_models(&self, credential: &str) -> Result<Vec<ModelInfo>, AiLlmError> {
        if credential.trim().is_empty() {
            return Err(AiLlmError::MissingCredential);
        }
        let url = self.models_url();
        let started = Instant::now();

        debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .query(&[("key", credential)])
            .send()
            .await
            .map_err(AiLlmError::connectivity)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let message = upstream_message(&text);

            error!(
                %status,
                %url,
                %message,
                latency_ms = started.elapsed().as_millis(),
                "model discovery returned non-success status"
            );

            return Err(classify_discovery_failure(HttpError {
                status,
                url,
                message,
            }));
        }

        let out: ListModelsResponse = resp.json().await.map_err(|e| {
            AiLlmError::Decode(format!(
                "serde error: {}; expected `models[].name`",
                e.without_url()
            ))
        })?;

        let models: Vec<ModelInfo> = out
            .models
            .into_iter()
            .map(|m| ModelInfo {
                name: bare_model_id(&m.name).to_string(),
                display_name: m.display_name,
                supported_generation_methods: m.supported_generation_methods,
            })
            .collect();

        info!(
            count = models.len(),
            latency_ms = started.elapsed().as_millis(),
            "model discovery completed"
        );

        Ok(models)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiService {
    async fn generate(&self, credential: &str, model: &str, prompt: &str) -> Result<String, AiLlmError> {
        GeminiService::generate(self, credential, model, prompt).await
    }

    async fn list_generation_models(&self, credential: &str) -> Result<Vec<String>, AiLlmError> {
        let models = self.list_models(credential).await?;
        Ok(models
            .into_iter()
            .filter(ModelInfo::supports_generation)
            .map(|m| m.name)
            .collect())
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

/// Request body for `:generateContent` (single turn, text only).
#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

impl<'a> GenerateContentRequest<'a> {
    fn single_turn(text: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text }],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Minimal response for `:generateContent`.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first non-empty part of the first candidate.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .find(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Response body for model discovery.
#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<RawModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModel {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

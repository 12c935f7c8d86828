//! Unified error handling for `ai-llm-service`.
//!
//! This module exposes a single top-level error type [`AiLlmError`] for the whole
//! library. Its variants follow the failure taxonomy of the Gemini API as seen by
//! a chat client: connectivity, invalid credential, permission, quota, and
//! per-model unavailability. Config problems are grouped in [`ConfigError`].
//! Small helpers for reading/validating environment variables are provided and
//! return the unified [`Result<T>`] alias.
//!
//! All messages include the suffix `[AI LLM Service]` to simplify attribution in logs.

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiLlmError>;

/// Maximum number of characters kept from an upstream body in error messages.
const SNIPPET_MAX_CHARS: usize = 300;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `ai-llm-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiLlmError {
    /// Configuration/validation errors (startup/readiness).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client itself could not be constructed.
    #[error("[AI LLM Service] failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Network/transport failure reaching the endpoint. The URL is stripped
    /// before the error is stored because it carries the credential.
    #[error("[AI LLM Service] connectivity error: {0}")]
    Connectivity(#[source] reqwest::Error),

    /// The credential was rejected (bad, expired, or unauthorized key).
    #[error("[AI LLM Service] invalid credential: {0}")]
    InvalidCredential(HttpError),

    /// The credential is valid but lacks permission for the operation
    /// (typically: it can list models but cannot generate content).
    #[error("[AI LLM Service] permission denied: {0}")]
    Permission(HttpError),

    /// Rate or quota limit hit; transient from the user's point of view.
    #[error("[AI LLM Service] quota exceeded: {0}")]
    QuotaExceeded(HttpError),

    /// The model identifier is unknown or does not support generation.
    #[error("[AI LLM Service] model `{model}` unavailable: {source}")]
    ModelUnavailable {
        /// Bare model identifier that failed.
        model: String,
        /// Upstream response details.
        source: HttpError,
    },

    /// Any other non-successful upstream status.
    #[error("[AI LLM Service] upstream error: {0}")]
    Upstream(HttpError),

    /// Response payload could not be decoded as expected.
    #[error("[AI LLM Service] decode error: {0}")]
    Decode(String),

    /// A 2xx response without any usable candidate text.
    #[error("[AI LLM Service] model `{model}` returned no candidate text")]
    EmptyCandidates {
        /// Bare model identifier that answered.
        model: String,
    },

    /// No credential was supplied for an operation that needs one.
    #[error("[AI LLM Service] credential is not configured")]
    MissingCredential,

    /// The candidate model list was empty after deduplication.
    #[error("[AI LLM Service] no model candidates to try")]
    NoModelCandidates,
}

/// Flat classification of [`AiLlmError`] used by callers to pick messages
/// and by the credential check to build its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    InvalidCredential,
    Permission,
    QuotaExceeded,
    ModelUnavailable,
    Other,
}

impl AiLlmError {
    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AiLlmError::Connectivity(_) => ErrorKind::Connectivity,
            AiLlmError::InvalidCredential(_) | AiLlmError::MissingCredential => {
                ErrorKind::InvalidCredential
            }
            AiLlmError::Permission(_) => ErrorKind::Permission,
            AiLlmError::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            AiLlmError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            _ => ErrorKind::Other,
        }
    }

    /// Wraps a transport error, dropping the request URL (it holds the key).
    pub fn connectivity(err: reqwest::Error) -> Self {
        AiLlmError::Connectivity(err.without_url())
    }

    /// HTTP status of the upstream response, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AiLlmError::InvalidCredential(h)
            | AiLlmError::Permission(h)
            | AiLlmError::QuotaExceeded(h)
            | AiLlmError::Upstream(h)
            | AiLlmError::ModelUnavailable { source: h, .. } => Some(h.status),
            _ => None,
        }
    }
}

/* ------------------------------------------------------------------------- */
/* HTTP error details                                                        */
/* ------------------------------------------------------------------------- */

/// Details of a non-successful upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    /// Numeric HTTP status code.
    pub status: StatusCode,
    /// Request URL without query string.
    pub url: String,
    /// Upstream error message, or a trimmed body snippet.
    pub message: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} from {}: {}", self.status, self.url, self.message)
    }
}

impl std::error::Error for HttpError {}

/// Gemini error envelope: `{ "error": { "code", "message", "status" } }`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Extracts `error.message` from an upstream body, falling back to a snippet.
///
/// When the envelope carries a symbolic status (e.g. `INVALID_ARGUMENT`), it is
/// appended in brackets so classifiers can see it.
pub fn upstream_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) if !env.error.message.trim().is_empty() => match env.error.status {
            Some(s) if !s.is_empty() => format!("{} [{}]", env.error.message.trim(), s),
            _ => env.error.message.trim().to_string(),
        },
        _ => make_snippet(body),
    }
}

/// Trims a response body to a short single-line snippet for logs and errors.
pub fn make_snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_MAX_CHARS {
        flat
    } else {
        let mut out: String = flat.chars().take(SNIPPET_MAX_CHARS).collect();
        out.push('…');
        out
    }
}

/* ------------------------------------------------------------------------- */
/* Status classification                                                     */
/* ------------------------------------------------------------------------- */

/// Lowercase markers that identify a missing/unsupported model in a message.
const MODEL_MISSING_MARKERS: [&str; 2] = ["not found", "is not supported"];

/// Lowercase markers that identify a rejected key in a 400 response.
const BAD_KEY_MARKERS: [&str; 4] = ["api key", "api_key_invalid", "expired", "api_key"];

fn mentions_any(message: &str, markers: &[&str]) -> bool {
    let lower = message.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// Maps a failed `generateContent` response to the error taxonomy.
pub fn classify_generation_failure(model: &str, http: HttpError) -> AiLlmError {
    match http.status.as_u16() {
        401 => AiLlmError::InvalidCredential(http),
        400 if mentions_any(&http.message, &BAD_KEY_MARKERS) => AiLlmError::InvalidCredential(http),
        403 => AiLlmError::Permission(http),
        429 => AiLlmError::QuotaExceeded(http),
        404 => AiLlmError::ModelUnavailable {
            model: model.to_string(),
            source: http,
        },
        _ if mentions_any(&http.message, &MODEL_MISSING_MARKERS) => AiLlmError::ModelUnavailable {
            model: model.to_string(),
            source: http,
        },
        _ => AiLlmError::Upstream(http),
    }
}

/// Maps a failed model-discovery response to the error taxonomy.
///
/// Discovery has no model in the path, so a 400 can only mean a bad key.
pub fn classify_discovery_failure(http: HttpError) -> AiLlmError {
    match http.status.as_u16() {
        400 | 401 => AiLlmError::InvalidCredential(http),
        403 => AiLlmError::Permission(http),
        429 => AiLlmError::QuotaExceeded(http),
        _ => AiLlmError::Upstream(http),
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A number failed to parse (like timeouts or limits).
    #[error("[AI LLM Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `GEMINI_TIMEOUT_SECS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u64`).
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[AI LLM Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `GEMINI_ENDPOINT`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },

    /// Model name was empty or invalid.
    #[error("[AI LLM Service] model name must not be empty")]
    EmptyModel,
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Reads an optional, non-empty environment variable.
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`AiLlmError::Config`] with [`ConfigError::InvalidNumber`] if the
/// variable is set but not a valid `u64`.
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match env_opt(name) {
        Some(v) => v.parse::<u64>().map(Some).map_err(|_| {
            AiLlmError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }),
        None => Ok(None),
    }
}

/// Reads a comma-separated list from env (`None` if unset/empty).
///
/// Blank items are skipped.
pub fn env_list(name: &str) -> Option<Vec<String>> {
    env_opt(name).map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/* ------------------------------------------------------------------------- */
/* Validation helpers (return unified `Result<T>`)                           */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`AiLlmError::Config`] with [`ConfigError::InvalidFormat`] when
/// the string does not start with a valid HTTP scheme.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

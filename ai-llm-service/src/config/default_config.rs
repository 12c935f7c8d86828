//! Gemini client config loaded from environment variables.
//!
//! Every variable is optional; unset values fall back to the constants in
//! [`llm_model_config`](crate::config::llm_model_config).
//!
//! # Environment variables
//!
//! - `GEMINI_ENDPOINT`        = API host (must be http/https)
//! - `GEMINI_API_VERSION`     = path version segment (default `v1beta`)
//! - `GEMINI_DEFAULT_MODEL`   = model used when nothing usable is stored
//! - `GEMINI_FALLBACK_MODELS` = comma-separated fallback order
//! - `GEMINI_TIMEOUT_SECS`    = request timeout (u64)

use crate::{
    config::llm_model_config::GeminiConfig,
    error_handler::{AiLlmError, ConfigError, env_list, env_opt, env_opt_u64, validate_http_endpoint},
};

impl GeminiConfig {
    /// Builds a config from the environment, on top of [`GeminiConfig::default`].
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidFormat`] if `GEMINI_ENDPOINT` is not http/https
    /// - [`ConfigError::InvalidNumber`] if `GEMINI_TIMEOUT_SECS` is not a u64
    /// - [`ConfigError::EmptyModel`] if the fallback list is set but empty
    pub fn from_env() -> Result<Self, AiLlmError> {
        let mut cfg = GeminiConfig::default();

        if let Some(endpoint) = env_opt("GEMINI_ENDPOINT") {
            validate_http_endpoint("GEMINI_ENDPOINT", &endpoint)?;
            cfg.endpoint = endpoint;
        }
        if let Some(version) = env_opt("GEMINI_API_VERSION") {
            cfg.api_version = version.trim_matches('/').to_string();
        }
        if let Some(model) = env_opt("GEMINI_DEFAULT_MODEL") {
            cfg.default_model = model;
        }
        if let Some(list) = env_list("GEMINI_FALLBACK_MODELS") {
            if list.is_empty() {
                return Err(ConfigError::EmptyModel.into());
            }
            cfg.fallback_models = list;
        }
        cfg.timeout_secs = env_opt_u64("GEMINI_TIMEOUT_SECS")?;

        Ok(cfg)
    }
}

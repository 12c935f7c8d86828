/// Configuration for the Gemini generative-language client.
///
/// The credential is intentionally not part of this struct: it is supplied per
/// call, so a key can be validated before it is stored.
///
/// # Fields
///
/// - `endpoint`: API host base URL (e.g. `https://generativelanguage.googleapis.com`).
/// - `api_version`: Path version segment (e.g. `v1beta`).
/// - `default_model`: Model used when nothing usable is stored.
/// - `fallback_models`: Known-good identifiers tried after the current model, in order.
/// - `timeout_secs`: Optional request timeout in seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::config::llm_model_config::GeminiConfig;
///
/// let cfg = GeminiConfig {
///     endpoint: "https://generativelanguage.googleapis.com".to_string(),
///     timeout_secs: Some(30),
///     ..GeminiConfig::default()
/// };
/// assert_eq!(cfg.api_version, "v1beta");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// API host base URL.
    pub endpoint: String,

    /// API version path segment.
    pub api_version: String,

    /// Model identifier used when no usable model is persisted.
    pub default_model: String,

    /// Ordered fallback model identifiers.
    pub fallback_models: Vec<String>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}

/// Public Gemini API host.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// API version the client speaks.
pub const DEFAULT_API_VERSION: &str = "v1beta";

/// Fast and cheap model; used as the default and first fallback.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Fallback order: fastest, smartest, old stable, legacy.
pub const DEFAULT_FALLBACK_MODELS: [&str; 4] = [
    "gemini-1.5-flash",
    "gemini-1.5-pro",
    "gemini-1.0-pro",
    "gemini-pro",
];

/// Stored defaults that are migrated to [`DEFAULT_MODEL`] on load.
pub const LEGACY_MODELS: [&str; 1] = ["gemini-pro"];

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            fallback_models: DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
            timeout_secs: None,
        }
    }
}

//! Runtime limits loaded from environment variables.

use crate::error::ContextError;

/// Bounds applied to the serialized payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    /// Maximum overdue entries sent to the model.
    pub top_overdue: usize,
    /// Maximum client summaries sent to the model.
    pub all_clients: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            top_overdue: 50,
            all_clients: 100,
        }
    }
}

impl ContextLimits {
    /// Defaults overridden by `CONTEXT_TOP_OVERDUE` / `CONTEXT_MAX_CLIENTS`.
    pub fn from_env() -> Result<Self, ContextError> {
        let d = Self::default();
        Ok(Self {
            top_overdue: parse_usize("CONTEXT_TOP_OVERDUE")?.unwrap_or(d.top_overdue),
            all_clients: parse_usize("CONTEXT_MAX_CLIENTS")?.unwrap_or(d.all_clients),
        })
    }
}

fn env_opt(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_usize(var: &'static str) -> Result<Option<usize>, ContextError> {
    env_opt(var)
        .map(|v| {
            v.parse::<usize>().map_err(|_| ContextError::InvalidEnv {
                var,
                expected: "usize",
            })
        })
        .transpose()
}

/// Non-negative decimal rate, e.g. `0.02`.
pub(crate) fn env_rate(var: &'static str) -> Result<Option<f64>, ContextError> {
    env_opt(var)
        .map(|v| match v.parse::<f64>() {
            Ok(r) if r.is_finite() && r >= 0.0 => Ok(r),
            _ => Err(ContextError::InvalidEnv {
                var,
                expected: "non-negative decimal",
            }),
        })
        .transpose()
}

//! Typed error for the billing-context crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    /// The contracts file could not be read.
    #[error("[Billing Context] cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The contracts file is not in the expected shape.
    #[error("[Billing Context] malformed contracts in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The host store exists but exposes no data right now.
    #[error("[Billing Context] data store unavailable: {0}")]
    Unavailable(String),

    /// An env override had the wrong format.
    #[error("[Billing Context] invalid value in {var}: expected {expected}")]
    InvalidEnv {
        var: &'static str,
        expected: &'static str,
    },
}

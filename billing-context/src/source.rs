//! Accessors for the host's contract data.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{error::ContextError, model::Contract};

/// Read-only access to the host's contracts.
///
/// An `Err` means the store itself is unavailable; an empty vector is a
/// valid (empty) dataset.
pub trait ContractSource: Send + Sync {
    fn contracts(&self) -> Result<Vec<Contract>, ContextError>;
}

/// Contracts exported by the host as a JSON file.
///
/// Accepts either a bare array or the host's `{ "contracts": [...] }` database dump.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Export {
    Bare(Vec<Contract>),
    Database { contracts: Vec<Contract> },
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContractSource for JsonFileSource {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn contracts(&self) -> Result<Vec<Contract>, ContextError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| ContextError::Io {
            path: self.path.clone(),
            source,
        })?;
        let export: Export = serde_json::from_str(&text).map_err(|source| ContextError::Json {
            path: self.path.clone(),
            source,
        })?;
        let contracts = match export {
            Export::Bare(v) | Export::Database { contracts: v } => v,
        };
        debug!(count = contracts.len(), "contracts loaded");
        Ok(contracts)
    }
}

/// Contracts already resident in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    contracts: Vec<Contract>,
}

impl InMemorySource {
    pub fn new(contracts: Vec<Contract>) -> Self {
        Self { contracts }
    }
}

impl ContractSource for InMemorySource {
    fn contracts(&self) -> Result<Vec<Contract>, ContextError> {
        Ok(self.contracts.clone())
    }
}

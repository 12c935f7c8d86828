//! Client-local settings persisted across sessions.
//!
//! - Flat string key/value pairs, no schema versioning.
//! - [`FileSettingsStore`] keeps a JSON object on disk; every mutation rewrites
//!   the file through a temp file + rename so a crash never leaves half a file.
//!   On unix the file is created with mode `0600`; it holds the API key.
//! - [`MemorySettingsStore`] is the same contract without a disk.
//! - Default location: `<config dir>/billing-assistant/settings.json`, or
//!   `ASSISTANT_SETTINGS_PATH` when set.

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, info, instrument, warn};

pub mod errors;
use errors::{Result, SettingsError};

/// Key under which the API credential is stored.
pub const CREDENTIAL_KEY: &str = "ai_api_key";

/// Key under which the current model identifier is stored.
pub const MODEL_KEY: &str = "ai_model";

/// Env override for the settings file location.
pub const SETTINGS_PATH_ENV: &str = "ASSISTANT_SETTINGS_PATH";

/// String key/value persistence used by the chat layer.
pub trait SettingsStore: Send + Sync {
    /// Returns the stored value, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Deletes `key`; missing keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Resolves the settings file path from env or the platform config dir.
pub fn default_settings_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var(SETTINGS_PATH_ENV) {
        if !p.trim().is_empty() {
            return Ok(PathBuf::from(p));
        }
    }
    dirs::config_dir()
        .map(|d| d.join("billing-assistant").join("settings.json"))
        .ok_or(SettingsError::NoConfigDir)
}

/// JSON-file backed store. The file is read once at open.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettingsStore {
    /// Opens (or lazily creates) the store at `path`.
    ///
    /// A missing file is an empty store; the file is created on first write.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| SettingsError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("settings file not found; starting empty");
                BTreeMap::new()
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        info!(keys = values.len(), "settings loaded");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Opens the store at [`default_settings_path`].
    pub fn open_default() -> Result<Self> {
        Self::open(default_settings_path()?)
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(values).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, text.as_bytes()).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| SettingsError::Poisoned)?;
        let mut next = values.clone();
        if f(&mut next) {
            self.persist(&next)?;
            *values = next;
        }
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| SettingsError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!(key, "settings set");
        self.mutate(|m| m.insert(key.to_string(), value.to_string()).as_deref() != Some(value))
    }

    fn remove(&self, key: &str) -> Result<()> {
        debug!(key, "settings remove");
        self.mutate(|m| m.remove(key).is_some())
    }
}

/// In-memory store with the same semantics as [`FileSettingsStore`].
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `pairs`.
    pub fn with_values<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| SettingsError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| SettingsError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| SettingsError::Poisoned)?;
        if values.remove(key).is_none() {
            warn!(key, "remove of unknown settings key");
        }
        Ok(())
    }
}

/// Writes `bytes` to a fresh file readable only by the owner on unix.
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    // A leftover temp file would keep its old mode.
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

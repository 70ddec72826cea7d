//! Namespaced JSON persistence
//!
//! One slot per namespaced key, stored as a JSON file under the store
//! directory. Writers assume exclusive ownership of their namespace;
//! readers tolerate missing or malformed slots (a slot that fails to
//! parse is re-initialised rather than surfaced as an error).

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// JSON store errors
#[derive(Debug, Error)]
pub enum JsonStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Slot not found: {key}")]
    NotFound { key: String },
}

/// Result type for JSON store operations
pub type JsonStoreResult<T> = Result<T, JsonStoreError>;

/// Key-value JSON store rooted at a directory
///
/// Each key maps to `<dir>/<key>.json`. Writes are atomic (temp file then
/// rename) so a crash mid-write never leaves a half-written slot behind.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the slot backing `key`
    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Load the value stored under `key`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> JsonStoreResult<T> {
        let path = self.slot_path(key);
        if !path.exists() {
            return Err(JsonStoreError::NotFound {
                key: key.to_string(),
            });
        }
        let content = std::fs::read_to_string(&path)?;
        let value = serde_json::from_str(&content)?;
        Ok(value)
    }

    /// Load the value stored under `key`, falling back to the default
    ///
    /// A missing slot yields the default silently. A malformed slot is
    /// logged, re-initialised with the default, and the default returned;
    /// parse errors never propagate to the caller.
    pub fn get_or_default<T: DeserializeOwned + Serialize + Default>(&self, key: &str) -> T {
        match self.get(key) {
            Ok(value) => value,
            Err(JsonStoreError::NotFound { .. }) => T::default(),
            Err(e) => {
                warn!("re-initialising malformed slot {key}: {e}");
                let value = T::default();
                if let Err(e) = self.set(key, &value) {
                    warn!("failed to re-initialise slot {key}: {e}");
                }
                value
            }
        }
    }

    /// Store `value` under `key` atomically (write to temp, then rename)
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> JsonStoreResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.slot_path(key);
        let content = serde_json::to_string_pretty(value)?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &path)?;

        Ok(())
    }

    /// Remove the slot for `key`. Removing an absent slot is not an error.
    pub fn remove(&self, key: &str) -> JsonStoreResult<()> {
        let path = self.slot_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a slot exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.slot_path(key).exists()
    }
}

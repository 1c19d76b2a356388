use anyhow::{Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::constants::LOCAL_STORE_TMP_SUFFIX;

/// Durable string key/value store backed by one file per key.
///
/// Values are opaque strings, the way browser local storage keeps them.
/// [`LocalStore::load`] and [`LocalStore::save`] layer JSON on top.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            anyhow!(
                "Failed to create local store directory '{}': {}",
                root.display(),
                e
            )
        })?;
        debug!("Local store opened at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Read the raw value for `key`. Missing keys and unreadable files give `None`.
    pub fn get_item(&self, key: &str) -> Option<String> {
        let path = match self.path_for(key) {
            Ok(path) => path,
            Err(e) => {
                warn!("Rejected local store key '{}': {}", key, e);
                return None;
            }
        };

        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read local store key '{}': {}", key, e);
                None
            }
        }
    }

    /// Persist the raw value for `key`, replacing any previous value.
    /// Returns once the data has been written and renamed into place.
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!("{}{}", key, LOCAL_STORE_TMP_SUFFIX));

        fs::write(&tmp, value)
            .map_err(|e| anyhow!("Failed to write local store key '{}': {}", key, e))?;
        fs::rename(&tmp, &path)
            .map_err(|e| anyhow!("Failed to commit local store key '{}': {}", key, e))?;

        debug!("Local store key '{}' written ({} bytes)", key, value.len());
        Ok(())
    }

    /// Delete `key`. Deleting a missing key is not an error.
    pub fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow!("Failed to remove local store key '{}': {}", key, e)),
        }
    }

    /// Decode the JSON value stored under `key`.
    ///
    /// A missing key or content that does not decode as `T` yields `T::default()`.
    pub fn load<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.get_item(key) else {
            return T::default();
        };

        if raw.trim().is_empty() {
            return T::default();
        }

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "Malformed content under local store key '{}', using default: {}",
                    key, e
                );
                T::default()
            }
        }
    }

    /// Encode `value` as JSON and persist it under `key`
    pub fn save<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value)
            .map_err(|e| anyhow!("Failed to serialize value for key '{}': {}", key, e))?;
        self.set_item(key, &raw)
    }

    /// Last modification time of `key`, used to notice writes by other processes
    pub fn modified(&self, key: &str) -> Option<SystemTime> {
        let path = self.path_for(key).ok()?;
        fs::metadata(path).and_then(|meta| meta.modified()).ok()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(anyhow!("key is empty"));
    }
    if key.starts_with('.') {
        return Err(anyhow!("key must not start with '.'"));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(anyhow!("key contains unsupported characters: {}", key));
    }
    Ok(())
}

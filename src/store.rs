// Local key/value persistence
// One pretty-printed JSON document per key under the app directory.
// Last writer wins; there is no locking between processes.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{app_dir, ConfigError};

pub const STORE_DIR_NAME: &str = "store";
pub const LAST_OFFERS_KEY: &str = "last_offers";

// Error types for store access
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No stored value for key {0}")]
    NotFound(String),

    #[error("Stored value for key {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid store key {0:?}")]
    InvalidKey(String),
}

#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `<config dir>/flight_finder/store`.
    pub fn open_default() -> Result<Self, ConfigError> {
        Ok(Self::new(app_dir()?.join(STORE_DIR_NAME)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;

        let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&path, json).map_err(|source| StoreError::Io { path, source })?;

        debug!(key, "stored value");
        Ok(())
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()))
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

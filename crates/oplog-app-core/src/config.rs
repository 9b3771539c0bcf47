// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Keyed JSON config blobs.
//!
//! [`ConfigStore`] is the storage port (one opaque blob per key);
//! [`ConfigService`] puts JSON on top of it. Bridge settings and saved
//! identifier mappings both go through here.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::settings::{BridgeSettings, SETTINGS_KEY};

/// Where config blobs live.
pub trait ConfigStore {
    /// Blob stored under `key`. [`ConfigError::NotFound`] when absent.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replace the blob stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Config failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("[CONFIG_NOT_FOUND] no value stored")]
    NotFound,
    /// Backing storage failed.
    #[error("[CONFIG_IO] {0}")]
    Io(#[from] std::io::Error),
    /// Blob is not the JSON the caller asked for.
    #[error("[CONFIG_JSON] {0}")]
    Serde(#[from] serde_json::Error),
    /// Value parsed but is unusable.
    #[error("[CONFIG_INVALID] {0}")]
    Invalid(String),
    /// Anything else a store reports.
    #[error("[CONFIG] {0}")]
    Other(String),
}

/// JSON view over a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Value under `key`. A missing key or an empty blob is `Ok(None)`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        let bytes = match self.store.load_raw(key) {
            Err(ConfigError::NotFound) => return Ok(None),
            other => other?,
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Value under `key`, or `T::default()` when nothing is stored.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Store `value` under `key` as pretty JSON.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        self.store.save_raw(key, &serde_json::to_vec_pretty(value)?)
    }

    /// Bridge settings under [`SETTINGS_KEY`], defaults if absent. Stored
    /// settings are validated; defaults are not written back.
    pub fn load_settings(&self) -> Result<BridgeSettings, ConfigError> {
        let settings: BridgeSettings = self.load_or_default(SETTINGS_KEY)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate and store bridge settings.
    pub fn save_settings(&self, settings: &BridgeSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.save(SETTINGS_KEY, settings)
    }
}

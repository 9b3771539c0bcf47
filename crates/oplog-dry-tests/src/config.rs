// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use oplog_app_core::{BridgeSettings, ConfigError, ConfigStore, SETTINGS_KEY};

/// [`ConfigStore`] kept in memory, with call counters and scripted failures.
///
/// # Example
///
/// ```
/// use oplog_dry_tests::InMemoryConfigStore;
/// use oplog_app_core::{BridgeSettings, ConfigService};
///
/// let store = InMemoryConfigStore::new();
/// let service = ConfigService::new(store.clone());
/// service.save_settings(&BridgeSettings::default()).unwrap();
/// assert_eq!(store.save_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: BTreeMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `settings` under [`SETTINGS_KEY`].
    pub fn with_settings(settings: &BridgeSettings) -> Result<Self, ConfigError> {
        let store = Self::new();
        store.lock().data.insert(
            SETTINGS_KEY.to_owned(),
            serde_json::to_vec_pretty(settings)?,
        );
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store raw bytes under `key` without counting a save.
    pub fn insert_raw(&self, key: &str, data: &[u8]) {
        self.lock().data.insert(key.to_owned(), data.to_vec());
    }

    /// Fail every subsequent load.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.lock().fail_on_load = fail;
    }

    /// Fail every subsequent save.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.lock().fail_on_save = fail;
    }

    /// Load attempts, failed ones included.
    pub fn load_count(&self) -> usize {
        self.lock().load_count
    }

    /// Save attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock().data.keys().cloned().collect()
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut inner = self.lock();
        inner.load_count += 1;
        if inner.fail_on_load {
            return Err(ConfigError::Other("simulated load failure".into()));
        }
        inner.data.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        inner.save_count += 1;
        if inner.fail_on_save {
            return Err(ConfigError::Other("simulated save failure".into()));
        }
        inner.data.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}

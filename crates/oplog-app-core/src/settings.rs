// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bridge settings: gateway chain, transfer limits, address scheme and the
//! root-selection policy for space restores.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Config key the settings are stored under.
pub const SETTINGS_KEY: &str = "bridge";

/// How a space restore picks its root when the listing holds several root
/// descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootSelection {
    /// Refuse to restore from a space with more than one root descriptor.
    #[default]
    Strict,
    /// Pick the root descriptor with the smallest CID and warn.
    Lowest,
}

/// Tunables for backup and restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Gateway base URLs, tried in order. Blocks are fetched from
    /// `{gateway}/{remote_cid}`.
    pub gateways: Vec<String>,
    /// Timeout for one gateway attempt, in milliseconds.
    pub gateway_timeout_ms: u64,
    /// Upper bound on concurrent uploads or downloads. `1` is sequential.
    pub max_in_flight: usize,
    /// Scheme segment of database addresses (`/<scheme>/<root>`).
    pub address_scheme: String,
    /// Root selection for space restores.
    pub root_selection: RootSelection,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            gateways: vec![
                "https://w3s.link/ipfs".to_owned(),
                "https://ipfs.io/ipfs".to_owned(),
                "https://dweb.link/ipfs".to_owned(),
            ],
            gateway_timeout_ms: 10_000,
            max_in_flight: 1,
            address_scheme: "orbitdb".to_owned(),
            root_selection: RootSelection::Strict,
        }
    }
}

impl BridgeSettings {
    /// Reject settings the bridge cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateways.is_empty() {
            return Err(ConfigError::Invalid("at least one gateway is required".into()));
        }
        if let Some(bad) = self
            .gateways
            .iter()
            .find(|g| !(g.starts_with("http://") || g.starts_with("https://")))
        {
            return Err(ConfigError::Invalid(format!(
                "gateway {bad:?} is not an http(s) URL"
            )));
        }
        if self.gateway_timeout_ms == 0 {
            return Err(ConfigError::Invalid("gateway_timeout_ms must be > 0".into()));
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::Invalid("max_in_flight must be > 0".into()));
        }
        if self.address_scheme.is_empty() || self.address_scheme.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "address scheme {:?} must be a single path segment",
                self.address_scheme
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{ConfigService, ConfigStore};
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct CellStore(RefCell<HashMap<String, Vec<u8>>>);

    impl ConfigStore for CellStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.0.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(key.to_owned(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn defaults_are_valid() {
        BridgeSettings::default().validate().unwrap();
    }

    #[test]
    fn missing_settings_load_as_defaults() {
        let service = ConfigService::new(CellStore::default());
        assert_eq!(service.load_settings().unwrap(), BridgeSettings::default());
    }

    #[test]
    fn saved_settings_round_trip() {
        let service = ConfigService::new(CellStore::default());
        let settings = BridgeSettings {
            gateways: vec!["http://127.0.0.1:8080/ipfs".into()],
            max_in_flight: 4,
            root_selection: RootSelection::Lowest,
            ..BridgeSettings::default()
        };
        service.save_settings(&settings).unwrap();
        assert_eq!(service.load_settings().unwrap(), settings);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let store = CellStore::default();
        store
            .save_raw(SETTINGS_KEY, br#"{"max_in_flight": 8}"#)
            .unwrap();
        let settings = ConfigService::new(store).load_settings().unwrap();
        assert_eq!(settings.max_in_flight, 8);
        assert_eq!(settings.address_scheme, "orbitdb");
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let empty = BridgeSettings {
            gateways: Vec::new(),
            ..BridgeSettings::default()
        };
        assert!(matches!(empty.validate(), Err(ConfigError::Invalid(_))));

        let ftp = BridgeSettings {
            gateways: vec!["ftp://example".into()],
            ..BridgeSettings::default()
        };
        assert!(ftp.validate().is_err());

        let zero = BridgeSettings {
            max_in_flight: 0,
            ..BridgeSettings::default()
        };
        assert!(zero.validate().is_err());

        let scheme = BridgeSettings {
            address_scheme: "a/b".into(),
            ..BridgeSettings::default()
        };
        assert!(scheme.validate().is_err());
    }
}

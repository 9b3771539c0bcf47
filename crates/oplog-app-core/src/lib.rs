// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared configuration services for oplog-vault (config port, bridge settings).
//! Keeps storage adapters thin and the bridge free of filesystem concerns.

pub mod config;
pub mod settings;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use settings::{BridgeSettings, RootSelection, SETTINGS_KEY};

//! Configuration for the callbridge CLI
//!
//! Settings are persisted as TOML and resolved into [`BridgeSettings`] before
//! being handed to the hosting bridge.

mod config;
mod settings;

pub use config::{Config, ConfigError, CONFIG_ENV_VAR, CONFIG_KEYS, CONFIG_POINTER_FILE};
pub use settings::{BridgeSettings, Protocol};

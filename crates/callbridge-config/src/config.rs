use crate::settings::{BridgeSettings, Protocol};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "CALLBRIDGE_CONFIG";

/// Pointer file placed next to the default config to redirect it
pub const CONFIG_POINTER_FILE: &str = ".callbridge_config_path";

const CONFIG_FILE_NAME: &str = "callbridge.toml";

/// Keys accepted by `get`/`set`, in display order
pub const CONFIG_KEYS: &[&str] = &[
    "protocol",
    "assembly",
    "type-name",
    "method",
    "delegate-type",
    "base-dir",
    "host-library",
    "runtime-dir",
    "runtime-config",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Unknown config key: {0}. Supported keys: {keys}", keys = CONFIG_KEYS.join(", "))]
    UnknownKey(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_library: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_config: Option<String>,
}

impl Config {
    /// Default config directory, `~/.config/callbridge` (or the platform config dir on Windows)
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        #[cfg(not(target_os = "windows"))]
        let dir = dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".config")
            .join("callbridge");

        #[cfg(target_os = "windows")]
        let dir = dirs::config_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join("callbridge");

        Ok(dir)
    }

    /// Config path forced through `CALLBRIDGE_CONFIG`, ahead of any pointer file
    pub fn env_override() -> Option<PathBuf> {
        let env_path = std::env::var(CONFIG_ENV_VAR).ok()?;
        let trimmed = env_path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = Self::env_override() {
            return Ok(path);
        }

        let dir = Self::default_dir()?;
        if let Some(redirected) = read_pointer_file(&dir.join(CONFIG_POINTER_FILE)) {
            return Ok(redirected);
        }

        Ok(dir.join(CONFIG_FILE_NAME))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit file; a missing file yields the empty config
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "protocol" => self.protocol.map(|p| p.to_string()),
            "assembly" => self.assembly.clone(),
            "type-name" => self.type_name.clone(),
            "method" => self.method.clone(),
            "delegate-type" => self.delegate_type.clone(),
            "base-dir" => self.base_dir.clone(),
            "host-library" => self.host_library.clone(),
            "runtime-dir" => self.runtime_dir.clone(),
            "runtime-config" => self.runtime_config.clone(),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        match key {
            "protocol" => {
                let protocol = value.parse::<Protocol>().map_err(|reason| {
                    ConfigError::InvalidValue {
                        key: key.to_string(),
                        reason,
                    }
                })?;
                self.protocol = Some(protocol);
            }
            "assembly" => self.assembly = Some(value),
            "type-name" => self.type_name = Some(value),
            "method" => self.method = Some(value),
            "delegate-type" => self.delegate_type = Some(value),
            "base-dir" => self.base_dir = Some(value),
            "host-library" => self.host_library = Some(value),
            "runtime-dir" => self.runtime_dir = Some(value),
            "runtime-config" => self.runtime_config = Some(value),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self == &Config::default()
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }

    /// Resolve into bridge settings, filling gaps with the protocol's defaults
    ///
    /// `assembly`, `type-name` and `method` each fall back to the protocol's
    /// default on their own. A configured value is kept even when the
    /// protocol changes.
    pub fn bridge_settings(&self) -> Result<BridgeSettings, ConfigError> {
        let protocol = self.protocol.unwrap_or_default();
        let base_dir = match self.base_dir {
            Some(ref dir) => PathBuf::from(dir),
            None => std::env::current_dir()?,
        };

        let mut settings = BridgeSettings::for_protocol(protocol, base_dir);
        if let Some(ref assembly) = self.assembly {
            settings.assembly.clone_from(assembly);
        }
        if let Some(ref type_name) = self.type_name {
            settings.type_name.clone_from(type_name);
        }
        if let Some(ref method) = self.method {
            settings.method.clone_from(method);
        }
        settings.delegate_type.clone_from(&self.delegate_type);
        settings.host_library = self.host_library.as_ref().map(PathBuf::from);
        settings.runtime_dir = self.runtime_dir.as_ref().map(PathBuf::from);
        settings.runtime_config = self.runtime_config.as_ref().map(PathBuf::from);
        Ok(settings)
    }
}

fn read_pointer_file(pointer: &Path) -> Option<PathBuf> {
    let contents = fs::read_to_string(pointer).ok()?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

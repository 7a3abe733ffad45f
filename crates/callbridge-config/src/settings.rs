//! Hosting protocol selection and the resolved settings handed to the bridge
//!
//! `Config` stores everything as optional strings so it can round-trip through
//! TOML and the `config set` command. `BridgeSettings` is the fully resolved
//! view with defaults applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which native hosting protocol drives the bridge
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// `coreclr_initialize` / `coreclr_create_delegate` / `coreclr_shutdown`
    Legacy,
    /// `hostfxr_initialize_for_runtime_config` and the runtime delegate handshake
    #[default]
    Modern,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Legacy => "legacy",
            Protocol::Modern => "modern",
        }
    }

    /// Managed entry point used when nothing is configured
    pub fn default_target(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Protocol::Legacy => ("OldRuntime.Api", "OldRuntime.Api.Api", "Calculate"),
            Protocol::Modern => (
                "NewRuntimeDelegateFree.Api",
                "NewRuntimeDelegateFree.Api.Api, NewRuntimeDelegateFree.Api",
                "Calculate",
            ),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "coreclr" => Ok(Protocol::Legacy),
            "modern" | "hostfxr" => Ok(Protocol::Modern),
            other => Err(format!(
                "unknown protocol '{}', expected 'legacy' or 'modern'",
                other
            )),
        }
    }
}

/// Fully resolved bridge settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub protocol: Protocol,
    /// Assembly identifier, without extension
    pub assembly: String,
    pub type_name: String,
    pub method: String,
    /// Managed delegate type; `None` requests an unmanaged-callers-only entry point
    pub delegate_type: Option<String>,
    /// Directory holding the target assembly (and its runtime config)
    pub base_dir: PathBuf,
    /// Explicit hosting library path, otherwise the well-known name is used
    pub host_library: Option<PathBuf>,
    /// Legacy only: directory scanned for trusted platform assemblies
    pub runtime_dir: Option<PathBuf>,
    /// Modern only: explicit runtime config file
    pub runtime_config: Option<PathBuf>,
}

impl BridgeSettings {
    /// Settings for `protocol` with its default target, rooted at `base_dir`
    pub fn for_protocol(protocol: Protocol, base_dir: PathBuf) -> Self {
        let (assembly, type_name, method) = protocol.default_target();
        Self {
            protocol,
            assembly: assembly.to_string(),
            type_name: type_name.to_string(),
            method: method.to_string(),
            delegate_type: None,
            base_dir,
            host_library: None,
            runtime_dir: None,
            runtime_config: None,
        }
    }
}

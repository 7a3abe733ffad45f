pub mod bench;
pub mod call;
pub mod config;
pub mod native;

use anyhow::Context;
use callbridge_config::{BridgeSettings, Config};
use callbridge_logger as logger;
use clap::Args;
use std::path::PathBuf;

/// Bridge selection flags shared by `call` and `bench`; each one overrides
/// the matching config key
#[derive(Args, Debug, Clone, Default)]
pub struct BridgeArgs {
    /// Hosting protocol: legacy (coreclr) or modern (hostfxr)
    #[arg(long)]
    pub protocol: Option<String>,

    /// Assembly name, without extension
    #[arg(long)]
    pub assembly: Option<String>,

    /// Fully qualified type name
    #[arg(long)]
    pub type_name: Option<String>,

    /// Method to bind
    #[arg(long)]
    pub method: Option<String>,

    /// Managed delegate type (modern only; default requests an unmanaged-callers-only method)
    #[arg(long)]
    pub delegate_type: Option<String>,

    /// Directory holding the assembly
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Explicit hosting library path
    #[arg(long, value_name = "PATH")]
    pub host_library: Option<PathBuf>,

    /// Runtime directory scanned for trusted assemblies (legacy only)
    #[arg(long, value_name = "DIR")]
    pub runtime_dir: Option<PathBuf>,

    /// Runtime config file (modern only)
    #[arg(long, value_name = "PATH")]
    pub runtime_config: Option<PathBuf>,
}

impl BridgeArgs {
    /// Layer these flags over the stored configuration
    pub fn resolve(&self) -> anyhow::Result<BridgeSettings> {
        let config = Config::load().context("Failed to load config")?;
        self.resolve_with(config)
    }

    pub fn resolve_with(&self, mut config: Config) -> anyhow::Result<BridgeSettings> {
        let overrides = [
            ("protocol", &self.protocol),
            ("assembly", &self.assembly),
            ("type-name", &self.type_name),
            ("method", &self.method),
            ("delegate-type", &self.delegate_type),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                config.set(key, value.clone())?;
            }
        }

        let mut settings = config.bridge_settings()?;
        if let Some(ref dir) = self.base_dir {
            settings.base_dir.clone_from(dir);
        }
        if self.host_library.is_some() {
            settings.host_library.clone_from(&self.host_library);
        }
        if self.runtime_dir.is_some() {
            settings.runtime_dir.clone_from(&self.runtime_dir);
        }
        if self.runtime_config.is_some() {
            settings.runtime_config.clone_from(&self.runtime_config);
        }

        logger::debug(&format!("Bridge settings: {:?}", settings));
        Ok(settings)
    }
}

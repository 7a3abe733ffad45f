use crate::errors::HostingError;
use crate::utils::{absolute_path, ASSEMBLY_EXTENSION, RUNTIME_CONFIG_SUFFIX};
use callbridge_config::BridgeSettings;
use std::path::PathBuf;

/// Names the managed entry point a hosting strategy binds to
///
/// Immutable once built: the bridge keeps the first caller's value for the
/// lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WrapperParams {
    assembly: String,
    type_name: String,
    method: String,
    delegate_type: Option<String>,
}

impl WrapperParams {
    pub fn new(
        assembly: impl Into<String>,
        type_name: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            assembly: assembly.into(),
            type_name: type_name.into(),
            method: method.into(),
            delegate_type: None,
        }
    }

    /// Bind through a managed delegate type instead of an unmanaged-callers-only method
    pub fn with_delegate_type(mut self, delegate_type: impl Into<String>) -> Self {
        self.delegate_type = Some(delegate_type.into());
        self
    }

    /// Assembly identifier, without extension
    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn delegate_type(&self) -> Option<&str> {
        self.delegate_type.as_deref()
    }
}

impl From<&BridgeSettings> for WrapperParams {
    fn from(settings: &BridgeSettings) -> Self {
        let params = WrapperParams::new(
            settings.assembly.clone(),
            settings.type_name.clone(),
            settings.method.clone(),
        );
        match settings.delegate_type {
            Some(ref delegate_type) => params.with_delegate_type(delegate_type.clone()),
            None => params,
        }
    }
}

/// Where a strategy finds its files; everything here is injected rather than discovered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLayout {
    /// Directory holding the target assembly; also the legacy AppDomain base path
    pub base_dir: PathBuf,
    /// Explicit hosting library, otherwise the platform's well-known file name
    pub host_library: Option<PathBuf>,
    /// Legacy: directory scanned for trusted platform assemblies
    pub runtime_dir: Option<PathBuf>,
    /// Modern: explicit runtime config file
    pub runtime_config: Option<PathBuf>,
}

impl HostLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            host_library: None,
            runtime_dir: None,
            runtime_config: None,
        }
    }

    /// Copy with `base_dir`, `runtime_dir` and `runtime_config` made absolute;
    /// the runtime only accepts absolute assembly and config paths
    pub fn resolved(&self) -> Result<Self, HostingError> {
        Ok(Self {
            base_dir: absolute_path(&self.base_dir)?,
            host_library: self.host_library.clone(),
            runtime_dir: self.runtime_dir.as_deref().map(absolute_path).transpose()?,
            runtime_config: self
                .runtime_config
                .as_deref()
                .map(absolute_path)
                .transpose()?,
        })
    }

    /// `<base_dir>/<assembly>.dll`
    pub fn assembly_path(&self, params: &WrapperParams) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", params.assembly(), ASSEMBLY_EXTENSION))
    }

    /// The injected runtime config, else `<base_dir>/<assembly>.runtimeconfig.json`
    pub fn runtime_config_path(&self, params: &WrapperParams) -> PathBuf {
        self.runtime_config.clone().unwrap_or_else(|| {
            self.base_dir
                .join(format!("{}{}", params.assembly(), RUNTIME_CONFIG_SUFFIX))
        })
    }

    /// The injected hosting library, else `default_name` for the OS loader to find
    pub fn host_library_or(&self, default_name: &str) -> PathBuf {
        self.host_library
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_name))
    }
}

impl From<&BridgeSettings> for HostLayout {
    fn from(settings: &BridgeSettings) -> Self {
        Self {
            base_dir: settings.base_dir.clone(),
            host_library: settings.host_library.clone(),
            runtime_dir: settings.runtime_dir.clone(),
            runtime_config: settings.runtime_config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callbridge_config::Protocol;
    use std::path::Path;

    #[test]
    fn test_derived_paths() {
        let params = WrapperParams::new(
            "NewRuntime.Api",
            "NewRuntime.Api.Api, NewRuntime.Api",
            "Calculate",
        );
        let layout = HostLayout::new("/opt/app");
        assert_eq!(
            layout.assembly_path(&params),
            Path::new("/opt/app/NewRuntime.Api.dll")
        );
        assert_eq!(
            layout.runtime_config_path(&params),
            Path::new("/opt/app/NewRuntime.Api.runtimeconfig.json")
        );
    }

    #[test]
    fn test_injected_paths_win() {
        let params = WrapperParams::new("A", "A.T", "M");
        let layout = HostLayout {
            runtime_config: Some(PathBuf::from("/etc/a.json")),
            host_library: Some(PathBuf::from("/usr/lib/dotnet/libhostfxr.so")),
            ..HostLayout::new("/opt/app")
        };
        assert_eq!(layout.runtime_config_path(&params), Path::new("/etc/a.json"));
        assert_eq!(
            layout.host_library_or("libhostfxr.so"),
            Path::new("/usr/lib/dotnet/libhostfxr.so")
        );
    }

    #[test]
    fn test_resolved_makes_paths_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let layout = HostLayout {
            runtime_dir: Some(PathBuf::from("runtime")),
            host_library: Some(PathBuf::from("libcoreclr.so")),
            ..HostLayout::new(".")
        }
        .resolved()
        .unwrap();

        assert_eq!(layout.base_dir, cwd);
        assert_eq!(layout.runtime_dir, Some(cwd.join("runtime")));
        assert_eq!(layout.runtime_config, None);
        // Bare names stay bare for the OS loader's search order
        assert_eq!(layout.host_library, Some(PathBuf::from("libcoreclr.so")));
        let params = WrapperParams::new("A", "A.T", "M");
        assert!(layout.assembly_path(&params).is_absolute());
    }

    #[test]
    fn test_from_settings() {
        let mut settings = BridgeSettings::for_protocol(Protocol::Modern, PathBuf::from("/srv"));
        settings.delegate_type = Some("Api+CalculateDelegate, Api".to_string());
        let params = WrapperParams::from(&settings);
        assert_eq!(params.assembly(), "NewRuntimeDelegateFree.Api");
        assert_eq!(params.delegate_type(), Some("Api+CalculateDelegate, Api"));
        assert_eq!(HostLayout::from(&settings).base_dir, PathBuf::from("/srv"));
    }
}

//! Legacy hosting protocol: `coreclr_initialize` with an explicit property
//! table, then `coreclr_create_delegate` for the target method.
//!
//! ## Handshake
//!
//! 1. Load the hosting library (injected path or the platform's well-known name)
//! 2. Resolve `coreclr_initialize`, `coreclr_create_delegate`, `coreclr_shutdown`
//! 3. Find the runtime directory: injected, else the hosting library's own
//!    directory, else the first `PATH` entry that contains it
//! 4. Build the trusted platform assembly list
//! 5. Start the runtime with `TRUSTED_PLATFORM_ASSEMBLIES` as the only property
//! 6. Create the delegate; on failure the runtime is shut down again
//!
//! A failure in step 5 leaves nothing to release. Nothing is released on
//! success either: the runtime stays up until the process exits.

use crate::callable::Callable;
use crate::entry_points::CoreclrEntryPoints;
use crate::errors::HostingError;
use crate::native_loader::LibraryLoader;
use crate::params::{HostLayout, WrapperParams};
use crate::strategy::{HostingStrategy, Outcome};
use crate::tpa::{TrustedAssemblyList, TRUSTED_PLATFORM_ASSEMBLIES};
use crate::utils::{absolute_path, find_in_search_path, narrow, narrow_path, CORECLR_LIBRARY};
use callbridge_config::Protocol;
use callbridge_logger as logger;
use std::ffi::{c_int, c_uint, c_void};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;
use std::time::Instant;

/// AppDomain friendly name passed to `coreclr_initialize`
pub const APP_DOMAIN_FRIENDLY_NAME: &str = "callbridge";

/// A started runtime: host handle plus the default AppDomain id
#[derive(Debug)]
struct CoreclrContext {
    handle: *mut c_void,
    domain_id: c_uint,
}

// SAFETY: the host handle is an opaque token the runtime accepts from any thread.
unsafe impl Send for CoreclrContext {}
unsafe impl Sync for CoreclrContext {}

impl CoreclrContext {
    fn shutdown(self, entry_points: &CoreclrEntryPoints) {
        let status = unsafe { (entry_points.shutdown)(self.handle, self.domain_id) };
        tracing::debug!(status, "coreclr_shutdown");
        if status != 0 {
            logger::warn(&format!(
                "coreclr_shutdown returned status {:#010x}",
                status
            ));
        }
    }
}

/// Hosting strategy for the legacy protocol
pub struct LegacyBridge {
    loader: Arc<dyn LibraryLoader>,
    layout: HostLayout,
    context: Option<CoreclrContext>,
    outcome: Outcome,
}

impl LegacyBridge {
    pub fn new(loader: Arc<dyn LibraryLoader>, layout: HostLayout) -> Self {
        Self {
            loader,
            layout,
            context: None,
            outcome: Outcome::default(),
        }
    }

    fn handshake(&mut self, params: &WrapperParams) -> Result<Callable, HostingError> {
        let start_time = Instant::now();

        let layout = self.layout.resolved()?;
        let assembly_path = layout.assembly_path(params);
        let base_dir = narrow_path(&layout.base_dir, "base directory")?;
        let friendly_name = narrow(APP_DOMAIN_FRIENDLY_NAME, "friendly name")?;
        let assembly = narrow(params.assembly(), "assembly")?;
        let type_name = narrow(params.type_name(), "type name")?;
        let method = narrow(params.method(), "method")?;

        // Steps 1-2
        let library_path = layout.host_library_or(CORECLR_LIBRARY);
        let library = self.loader.load(&library_path)?;
        let entry_points = CoreclrEntryPoints::resolve(library)?;

        // Steps 3-4
        let runtime_dir = find_runtime_dir(&layout, &library_path)
            .and_then(|dir| absolute_path(&dir).ok());
        let tpa = build_tpa(&assembly_path, runtime_dir.as_deref());
        logger::debug(&format!(
            "Trusted platform assemblies: {} entries",
            tpa.len()
        ));
        let tpa_value = narrow(&tpa.to_property_value()?, "trusted assembly list")?;
        let property_key = narrow(TRUSTED_PLATFORM_ASSEMBLIES, "property key")?;

        // Step 5
        let property_keys = [property_key.as_ptr()];
        let property_values = [tpa_value.as_ptr()];
        let mut handle: *mut c_void = ptr::null_mut();
        let mut domain_id: c_uint = 0;
        let status = unsafe {
            (entry_points.initialize)(
                base_dir.as_ptr(),
                friendly_name.as_ptr(),
                property_keys.len() as c_int,
                property_keys.as_ptr(),
                property_values.as_ptr(),
                &mut handle,
                &mut domain_id,
            )
        };
        tracing::debug!(status, domain_id, "coreclr_initialize");
        if status != 0 {
            return Err(HostingError::InitializationFailed {
                step: "initialize",
                code: status,
            });
        }
        let context = CoreclrContext { handle, domain_id };

        // Step 6
        let mut delegate: *mut c_void = ptr::null_mut();
        let status = unsafe {
            (entry_points.create_delegate)(
                context.handle,
                context.domain_id,
                assembly.as_ptr(),
                type_name.as_ptr(),
                method.as_ptr(),
                &mut delegate,
            )
        };
        tracing::debug!(status, "coreclr_create_delegate");

        // SAFETY: on success the runtime hands back a pointer to the method,
        // which lives as long as the runtime does.
        let callable = if status == 0 {
            unsafe { Callable::from_raw(delegate) }
        } else {
            None
        };

        match callable {
            Some(callable) => {
                self.context = Some(context);
                logger::debug(&format!(
                    "Legacy hosting handshake took: {:?}",
                    start_time.elapsed()
                ));
                Ok(callable)
            }
            None => {
                context.shutdown(&entry_points);
                Err(HostingError::DelegateCreationFailed(status))
            }
        }
    }

}

/// Injected runtime directory, else the injected hosting library's directory,
/// else the first `PATH` entry holding the library
fn find_runtime_dir(layout: &HostLayout, library_path: &Path) -> Option<PathBuf> {
    if let Some(ref dir) = layout.runtime_dir {
        return Some(dir.clone());
    }
    if layout.host_library.is_some() {
        if let Some(parent) = library_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            return Some(parent.to_path_buf());
        }
    }
    find_in_search_path(CORECLR_LIBRARY)
}

/// An unreadable or missing runtime directory leaves only the target assembly
fn build_tpa(assembly_path: &Path, runtime_dir: Option<&Path>) -> TrustedAssemblyList {
    let Some(runtime_dir) = runtime_dir else {
        logger::warn(&format!(
            "Runtime directory containing {} not found; trusting only the target assembly",
            CORECLR_LIBRARY
        ));
        return TrustedAssemblyList::new(assembly_path);
    };

    logger::debug(&format!("Runtime directory: {}", runtime_dir.display()));
    match TrustedAssemblyList::scan(assembly_path, runtime_dir) {
        Ok(list) => list,
        Err(e) => {
            logger::warn(&format!(
                "Failed to scan runtime directory {}: {}",
                runtime_dir.display(),
                e
            ));
            TrustedAssemblyList::new(assembly_path)
        }
    }
}

impl HostingStrategy for LegacyBridge {
    fn protocol(&self) -> Protocol {
        Protocol::Legacy
    }

    fn initialize(&mut self, params: &WrapperParams) -> Result<Callable, HostingError> {
        let mut outcome = std::mem::take(&mut self.outcome);
        let result = outcome.get_or_run(|| self.handshake(params));
        self.outcome = outcome;
        result
    }

    fn get_callable(&self) -> Result<Callable, HostingError> {
        self.outcome.callable()
    }
}

//! Modern hosting protocol driven by a runtime config file
//!
//! `hostfxr_initialize_for_runtime_config` yields a host context; the context
//! hands out the `load_assembly_and_get_function_pointer` runtime delegate,
//! and that delegate resolves the target method to a native function pointer.
//! If either delegate step fails the context is closed again.

use crate::callable::Callable;
use crate::entry_points::{
    HostfxrEntryPoints, LoadAssemblyAndGetFunctionPointerFn,
    HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER, UNMANAGEDCALLERSONLY_METHOD,
};
use crate::errors::HostingError;
use crate::native_loader::LibraryLoader;
use crate::params::{HostLayout, WrapperParams};
use crate::strategy::{HostingStrategy, Outcome};
use crate::utils::{PalString, HOSTFXR_LIBRARY};
use callbridge_config::Protocol;
use callbridge_logger as logger;
use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
struct HostfxrContext(*mut c_void);

// SAFETY: hostfxr context handles are opaque and not tied to the creating thread.
unsafe impl Send for HostfxrContext {}
unsafe impl Sync for HostfxrContext {}

impl HostfxrContext {
    fn close(self, entry_points: &HostfxrEntryPoints) {
        let status = unsafe { (entry_points.close)(self.0) };
        tracing::debug!(status, "hostfxr_close");
        if status != 0 {
            logger::warn(&format!("hostfxr_close returned status {:#010x}", status));
        }
    }
}

/// Hosting strategy for the modern protocol
pub struct ModernBridge {
    loader: Arc<dyn LibraryLoader>,
    layout: HostLayout,
    context: Option<HostfxrContext>,
    outcome: Outcome,
}

impl ModernBridge {
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
        let config_path = layout.runtime_config_path(params);
        let runtime_config = PalString::new(&config_path, "runtime config path")?;
        let assembly_path = PalString::new(layout.assembly_path(params), "assembly path")?;
        let type_name = PalString::new(params.type_name(), "type name")?;
        let method = PalString::new(params.method(), "method")?;
        let delegate_type = params
            .delegate_type()
            .map(|name| PalString::new(name, "delegate type"))
            .transpose()?;

        let library = self.loader.load(&layout.host_library_or(HOSTFXR_LIBRARY))?;
        let entry_points = HostfxrEntryPoints::resolve(library)?;

        logger::debug(&format!("Runtime config: {}", config_path.display()));
        let mut handle: *mut c_void = ptr::null_mut();
        let status = unsafe {
            (entry_points.initialize_for_runtime_config)(
                runtime_config.as_ptr(),
                ptr::null(),
                &mut handle,
            )
        };
        tracing::debug!(status, "hostfxr_initialize_for_runtime_config");
        if status != 0 || handle.is_null() {
            return Err(HostingError::InitializationFailed {
                step: "initialize",
                code: status,
            });
        }
        let context = HostfxrContext(handle);

        let mut load_delegate: *mut c_void = ptr::null_mut();
        let status = unsafe {
            (entry_points.get_runtime_delegate)(
                context.0,
                HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER,
                &mut load_delegate,
            )
        };
        tracing::debug!(status, "hostfxr_get_runtime_delegate");
        if status != 0 || load_delegate.is_null() {
            context.close(&entry_points);
            return Err(HostingError::InitializationFailed {
                step: "get_delegate",
                code: status,
            });
        }
        // SAFETY: hdt_load_assembly_and_get_function_pointer has this signature.
        let load_assembly = unsafe {
            std::mem::transmute::<*mut c_void, LoadAssemblyAndGetFunctionPointerFn>(load_delegate)
        };

        let delegate_type_ptr = delegate_type
            .as_ref()
            .map_or(UNMANAGEDCALLERSONLY_METHOD, PalString::as_ptr);
        let mut function: *mut c_void = ptr::null_mut();
        let status = unsafe {
            load_assembly(
                assembly_path.as_ptr(),
                type_name.as_ptr(),
                method.as_ptr(),
                delegate_type_ptr,
                ptr::null_mut(),
                &mut function,
            )
        };
        tracing::debug!(status, "load_assembly_and_get_function_pointer");

        // SAFETY: the runtime returns a pointer to the requested method.
        let callable = if status == 0 {
            unsafe { Callable::from_raw(function) }
        } else {
            None
        };

        match callable {
            Some(callable) => {
                self.context = Some(context);
                logger::debug(&format!(
                    "Modern hosting handshake took: {:?}",
                    start_time.elapsed()
                ));
                Ok(callable)
            }
            None => {
                context.close(&entry_points);
                Err(HostingError::DelegateCreationFailed(status))
            }
        }
    }
}

impl HostingStrategy for ModernBridge {
    fn protocol(&self) -> Protocol {
        Protocol::Modern
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

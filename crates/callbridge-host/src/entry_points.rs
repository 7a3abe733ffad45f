//! Typed handles over the hosting libraries' exported entry points
//!
//! Symbols are looked up by name, then immediately cast to their declared
//! signature. A table is only built once every symbol it needs resolved, so
//! no handshake step ever runs against a partially resolved library.

use crate::errors::HostingError;
use crate::native_loader::NativeLibrary;
use crate::utils::CharT;
use std::ffi::{c_char, c_int, c_uint, c_void};
use std::mem::transmute;
use std::ptr::NonNull;

pub const CORECLR_INITIALIZE: &str = "coreclr_initialize";
pub const CORECLR_CREATE_DELEGATE: &str = "coreclr_create_delegate";
pub const CORECLR_SHUTDOWN: &str = "coreclr_shutdown";

pub const HOSTFXR_INITIALIZE_FOR_RUNTIME_CONFIG: &str = "hostfxr_initialize_for_runtime_config";
pub const HOSTFXR_GET_RUNTIME_DELEGATE: &str = "hostfxr_get_runtime_delegate";
pub const HOSTFXR_CLOSE: &str = "hostfxr_close";

/// `hostfxr_delegate_type::hdt_load_assembly_and_get_function_pointer`
pub const HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER: c_int = 5;

pub type CoreclrInitializeFn = unsafe extern "system" fn(
    exe_path: *const c_char,
    app_domain_friendly_name: *const c_char,
    property_count: c_int,
    property_keys: *const *const c_char,
    property_values: *const *const c_char,
    host_handle: *mut *mut c_void,
    domain_id: *mut c_uint,
) -> c_int;

pub type CoreclrCreateDelegateFn = unsafe extern "system" fn(
    host_handle: *mut c_void,
    domain_id: c_uint,
    entry_point_assembly_name: *const c_char,
    entry_point_type_name: *const c_char,
    entry_point_method_name: *const c_char,
    delegate: *mut *mut c_void,
) -> c_int;

pub type CoreclrShutdownFn =
    unsafe extern "system" fn(host_handle: *mut c_void, domain_id: c_uint) -> c_int;

pub type HostfxrInitializeForRuntimeConfigFn = unsafe extern "C" fn(
    runtime_config_path: *const CharT,
    parameters: *const c_void,
    host_context_handle: *mut *mut c_void,
) -> i32;

pub type HostfxrGetRuntimeDelegateFn = unsafe extern "C" fn(
    host_context_handle: *mut c_void,
    delegate_type: c_int,
    delegate: *mut *mut c_void,
) -> i32;

pub type HostfxrCloseFn = unsafe extern "C" fn(host_context_handle: *mut c_void) -> i32;

/// The delegate handed out for `hdt_load_assembly_and_get_function_pointer`
pub type LoadAssemblyAndGetFunctionPointerFn = unsafe extern "system" fn(
    assembly_path: *const CharT,
    type_name: *const CharT,
    method_name: *const CharT,
    delegate_type_name: *const CharT,
    reserved: *mut c_void,
    delegate: *mut *mut c_void,
) -> i32;

/// `UNMANAGEDCALLERSONLY_METHOD`: `(const char_t*)-1`
pub const UNMANAGEDCALLERSONLY_METHOD: *const CharT = usize::MAX as *const CharT;

fn resolve(library: &dyn NativeLibrary, name: &str) -> Result<NonNull<c_void>, HostingError> {
    let symbol = library
        .symbol(name)
        .ok_or_else(|| HostingError::MissingEntryPoint(name.to_string()))?;
    tracing::trace!(
        symbol = name,
        library = %library.path().display(),
        address = ?symbol,
        "resolved entry point"
    );
    Ok(symbol)
}

/// Entry points of the legacy hosting library
#[derive(Clone, Copy)]
pub struct CoreclrEntryPoints {
    pub initialize: CoreclrInitializeFn,
    pub create_delegate: CoreclrCreateDelegateFn,
    pub shutdown: CoreclrShutdownFn,
}

impl CoreclrEntryPoints {
    pub fn resolve(library: &dyn NativeLibrary) -> Result<Self, HostingError> {
        let initialize = resolve(library, CORECLR_INITIALIZE)?;
        let create_delegate = resolve(library, CORECLR_CREATE_DELEGATE)?;
        let shutdown = resolve(library, CORECLR_SHUTDOWN)?;

        // SAFETY: the symbols are exported by the hosting library under these
        // names with the signatures declared above.
        unsafe {
            Ok(Self {
                initialize: transmute::<*mut c_void, CoreclrInitializeFn>(initialize.as_ptr()),
                create_delegate: transmute::<*mut c_void, CoreclrCreateDelegateFn>(
                    create_delegate.as_ptr(),
                ),
                shutdown: transmute::<*mut c_void, CoreclrShutdownFn>(shutdown.as_ptr()),
            })
        }
    }
}

/// Entry points of the modern hosting library
#[derive(Clone, Copy)]
pub struct HostfxrEntryPoints {
    pub initialize_for_runtime_config: HostfxrInitializeForRuntimeConfigFn,
    pub get_runtime_delegate: HostfxrGetRuntimeDelegateFn,
    pub close: HostfxrCloseFn,
}

impl HostfxrEntryPoints {
    pub fn resolve(library: &dyn NativeLibrary) -> Result<Self, HostingError> {
        let initialize = resolve(library, HOSTFXR_INITIALIZE_FOR_RUNTIME_CONFIG)?;
        let get_runtime_delegate = resolve(library, HOSTFXR_GET_RUNTIME_DELEGATE)?;
        let close = resolve(library, HOSTFXR_CLOSE)?;

        // SAFETY: see `CoreclrEntryPoints::resolve`.
        unsafe {
            Ok(Self {
                initialize_for_runtime_config: transmute::<
                    *mut c_void,
                    HostfxrInitializeForRuntimeConfigFn,
                >(initialize.as_ptr()),
                get_runtime_delegate: transmute::<*mut c_void, HostfxrGetRuntimeDelegateFn>(
                    get_runtime_delegate.as_ptr(),
                ),
                close: transmute::<*mut c_void, HostfxrCloseFn>(close.as_ptr()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubLibrary;

    #[test]
    fn test_resolve_all_coreclr_symbols() {
        let library = StubLibrary::complete();
        assert!(CoreclrEntryPoints::resolve(&library).is_ok());
    }

    #[test]
    fn test_first_missing_symbol_is_reported() {
        for missing in [CORECLR_INITIALIZE, CORECLR_CREATE_DELEGATE, CORECLR_SHUTDOWN] {
            let library = StubLibrary::without(missing);
            let err = CoreclrEntryPoints::resolve(&library).err().unwrap();
            assert_eq!(err, HostingError::MissingEntryPoint(missing.to_string()));
        }

        for missing in [
            HOSTFXR_INITIALIZE_FOR_RUNTIME_CONFIG,
            HOSTFXR_GET_RUNTIME_DELEGATE,
            HOSTFXR_CLOSE,
        ] {
            let library = StubLibrary::without(missing);
            let err = HostfxrEntryPoints::resolve(&library).err().unwrap();
            assert_eq!(err, HostingError::MissingEntryPoint(missing.to_string()));
        }
    }
}

//! In-process stand-in for the hosting libraries
//!
//! Exposes fake `coreclr_*` and `hostfxr_*` entry points with the real
//! signatures, so both handshakes run end to end. Every handshake call happens
//! on the calling thread, so the recorded calls and the configured status
//! codes are thread-local and tests do not interfere with each other.

use crate::callable::CalculateFn;
use crate::entry_points::{
    CoreclrCreateDelegateFn, CoreclrInitializeFn, CoreclrShutdownFn, HostfxrCloseFn,
    HostfxrGetRuntimeDelegateFn, HostfxrInitializeForRuntimeConfigFn,
    LoadAssemblyAndGetFunctionPointerFn, CORECLR_CREATE_DELEGATE, CORECLR_INITIALIZE,
    CORECLR_SHUTDOWN, HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER, HOSTFXR_CLOSE,
    HOSTFXR_GET_RUNTIME_DELEGATE, HOSTFXR_INITIALIZE_FOR_RUNTIME_CONFIG,
    UNMANAGEDCALLERSONLY_METHOD,
};
use crate::errors::HostingError;
use crate::native_loader::{LibraryLoader, NativeLibrary};
use crate::utils::{read_pal, CharT};
use std::cell::{Cell, RefCell};
use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

/// `E_FAIL`
pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;

/// Returned when a stub receives a handle it never handed out
const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;

/// Name recorded when the runtime delegate is invoked
pub const LOAD_ASSEMBLY: &str = "load_assembly_and_get_function_pointer";

/// Export name of the stub's own calculation function
pub const CALCULATE_EXPORT: &str = "calculate";

const FAKE_HOST_HANDLE: usize = 0x5EED;
const FAKE_DOMAIN_ID: c_uint = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub assembly_path: String,
    pub type_name: String,
    pub method: String,
    pub delegate_type: Option<String>,
}

thread_local! {
    static CALLS: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    static INITIALIZE_STATUS: Cell<i32> = const { Cell::new(0) };
    static GET_DELEGATE_STATUS: Cell<i32> = const { Cell::new(0) };
    static DELEGATE_STATUS: Cell<i32> = const { Cell::new(0) };
    static NULL_CONTEXT: Cell<bool> = const { Cell::new(false) };
    static BASE_PATH: RefCell<Option<String>> = const { RefCell::new(None) };
    static PROPERTY: RefCell<Option<(String, String)>> = const { RefCell::new(None) };
    static DELEGATE_TARGET: RefCell<Option<(String, String, String)>> = const { RefCell::new(None) };
    static RUNTIME_CONFIG: RefCell<Option<String>> = const { RefCell::new(None) };
    static LOAD_REQUEST: RefCell<Option<LoadRequest>> = const { RefCell::new(None) };
}

/// Clear recorded calls and restore success status codes
pub fn reset() {
    CALLS.with(|c| c.borrow_mut().clear());
    INITIALIZE_STATUS.with(|s| s.set(0));
    GET_DELEGATE_STATUS.with(|s| s.set(0));
    DELEGATE_STATUS.with(|s| s.set(0));
    NULL_CONTEXT.with(|s| s.set(false));
    BASE_PATH.with(|v| v.borrow_mut().take());
    PROPERTY.with(|v| v.borrow_mut().take());
    DELEGATE_TARGET.with(|v| v.borrow_mut().take());
    RUNTIME_CONFIG.with(|v| v.borrow_mut().take());
    LOAD_REQUEST.with(|v| v.borrow_mut().take());
}

pub fn calls() -> Vec<&'static str> {
    CALLS.with(|c| c.borrow().clone())
}

/// Status returned by `coreclr_initialize` / `hostfxr_initialize_for_runtime_config`
pub fn set_initialize_status(status: i32) {
    INITIALIZE_STATUS.with(|s| s.set(status));
}

/// Status returned by `hostfxr_get_runtime_delegate`
pub fn set_get_delegate_status(status: i32) {
    GET_DELEGATE_STATUS.with(|s| s.set(status));
}

/// Status returned by `coreclr_create_delegate` / the load-assembly delegate
pub fn set_delegate_status(status: i32) {
    DELEGATE_STATUS.with(|s| s.set(status));
}

/// Make `hostfxr_initialize_for_runtime_config` succeed without a context
pub fn set_null_context(enabled: bool) {
    NULL_CONTEXT.with(|s| s.set(enabled));
}

pub fn initialize_base_path() -> Option<String> {
    BASE_PATH.with(|v| v.borrow().clone())
}

pub fn initialize_property() -> Option<(String, String)> {
    PROPERTY.with(|v| v.borrow().clone())
}

pub fn delegate_target() -> Option<(String, String, String)> {
    DELEGATE_TARGET.with(|v| v.borrow().clone())
}

pub fn runtime_config_path() -> Option<String> {
    RUNTIME_CONFIG.with(|v| v.borrow().clone())
}

pub fn load_assembly_request() -> Option<LoadRequest> {
    LOAD_REQUEST.with(|v| v.borrow().clone())
}

fn record(name: &'static str) {
    CALLS.with(|c| c.borrow_mut().push(name));
}

/// The managed method every stub handshake resolves to
pub extern "system-unwind" fn stub_add(a: i32, b: i32) -> i32 {
    a + b
}

unsafe fn narrow_string(ptr: *const c_char) -> String {
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

unsafe extern "system" fn coreclr_initialize(
    exe_path: *const c_char,
    _app_domain_friendly_name: *const c_char,
    property_count: c_int,
    property_keys: *const *const c_char,
    property_values: *const *const c_char,
    host_handle: *mut *mut c_void,
    domain_id: *mut c_uint,
) -> c_int {
    record(CORECLR_INITIALIZE);
    BASE_PATH.with(|v| *v.borrow_mut() = Some(narrow_string(exe_path)));
    if property_count > 0 {
        let key = narrow_string(*property_keys);
        let value = narrow_string(*property_values);
        PROPERTY.with(|v| *v.borrow_mut() = Some((key, value)));
    }

    let status = INITIALIZE_STATUS.with(Cell::get);
    if status == 0 {
        *host_handle = FAKE_HOST_HANDLE as *mut c_void;
        *domain_id = FAKE_DOMAIN_ID;
    }
    status
}

unsafe extern "system" fn coreclr_create_delegate(
    host_handle: *mut c_void,
    domain_id: c_uint,
    assembly: *const c_char,
    type_name: *const c_char,
    method: *const c_char,
    delegate: *mut *mut c_void,
) -> c_int {
    record(CORECLR_CREATE_DELEGATE);
    if host_handle as usize != FAKE_HOST_HANDLE || domain_id != FAKE_DOMAIN_ID {
        return E_INVALIDARG;
    }
    DELEGATE_TARGET.with(|v| {
        *v.borrow_mut() = Some((
            narrow_string(assembly),
            narrow_string(type_name),
            narrow_string(method),
        ));
    });

    let status = DELEGATE_STATUS.with(Cell::get);
    if status == 0 {
        *delegate = stub_add as CalculateFn as *mut c_void;
    }
    status
}

unsafe extern "system" fn coreclr_shutdown(_host_handle: *mut c_void, _domain_id: c_uint) -> c_int {
    record(CORECLR_SHUTDOWN);
    0
}

unsafe extern "C" fn hostfxr_initialize_for_runtime_config(
    runtime_config_path: *const CharT,
    _parameters: *const c_void,
    host_context_handle: *mut *mut c_void,
) -> i32 {
    record(HOSTFXR_INITIALIZE_FOR_RUNTIME_CONFIG);
    RUNTIME_CONFIG.with(|v| *v.borrow_mut() = Some(read_pal(runtime_config_path)));

    let status = INITIALIZE_STATUS.with(Cell::get);
    if status == 0 && !NULL_CONTEXT.with(Cell::get) {
        *host_context_handle = FAKE_HOST_HANDLE as *mut c_void;
    }
    status
}

unsafe extern "C" fn hostfxr_get_runtime_delegate(
    host_context_handle: *mut c_void,
    delegate_type: c_int,
    delegate: *mut *mut c_void,
) -> i32 {
    record(HOSTFXR_GET_RUNTIME_DELEGATE);
    if host_context_handle as usize != FAKE_HOST_HANDLE
        || delegate_type != HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER
    {
        return E_INVALIDARG;
    }

    let status = GET_DELEGATE_STATUS.with(Cell::get);
    if status == 0 {
        *delegate = load_assembly_and_get_function_pointer as LoadAssemblyAndGetFunctionPointerFn
            as *mut c_void;
    }
    status
}

unsafe extern "C" fn hostfxr_close(_host_context_handle: *mut c_void) -> i32 {
    record(HOSTFXR_CLOSE);
    0
}

unsafe extern "system" fn load_assembly_and_get_function_pointer(
    assembly_path: *const CharT,
    type_name: *const CharT,
    method_name: *const CharT,
    delegate_type_name: *const CharT,
    _reserved: *mut c_void,
    delegate: *mut *mut c_void,
) -> i32 {
    record(LOAD_ASSEMBLY);
    let delegate_type = if delegate_type_name == UNMANAGEDCALLERSONLY_METHOD {
        None
    } else {
        Some(read_pal(delegate_type_name))
    };
    LOAD_REQUEST.with(|v| {
        *v.borrow_mut() = Some(LoadRequest {
            assembly_path: read_pal(assembly_path),
            type_name: read_pal(type_name),
            method: read_pal(method_name),
            delegate_type,
        });
    });

    let status = DELEGATE_STATUS.with(Cell::get);
    if status == 0 {
        *delegate = stub_add as CalculateFn as *mut c_void;
    }
    status
}

/// Stub hosting library exporting both protocols' entry points
#[derive(Debug, Clone, Copy)]
pub struct StubLibrary {
    missing: Option<&'static str>,
}

impl StubLibrary {
    pub fn complete() -> Self {
        Self { missing: None }
    }

    /// A library that does not export `symbol`
    pub fn without(symbol: &'static str) -> Self {
        Self {
            missing: Some(symbol),
        }
    }
}

impl NativeLibrary for StubLibrary {
    fn path(&self) -> &Path {
        Path::new("stub-hosting-library")
    }

    fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        if self.missing == Some(name) {
            return None;
        }
        let address = match name {
            CORECLR_INITIALIZE => coreclr_initialize as CoreclrInitializeFn as *mut c_void,
            CORECLR_CREATE_DELEGATE => {
                coreclr_create_delegate as CoreclrCreateDelegateFn as *mut c_void
            }
            CORECLR_SHUTDOWN => coreclr_shutdown as CoreclrShutdownFn as *mut c_void,
            HOSTFXR_INITIALIZE_FOR_RUNTIME_CONFIG => {
                hostfxr_initialize_for_runtime_config as HostfxrInitializeForRuntimeConfigFn
                    as *mut c_void
            }
            HOSTFXR_GET_RUNTIME_DELEGATE => {
                hostfxr_get_runtime_delegate as HostfxrGetRuntimeDelegateFn as *mut c_void
            }
            HOSTFXR_CLOSE => hostfxr_close as HostfxrCloseFn as *mut c_void,
            CALCULATE_EXPORT => stub_add as CalculateFn as *mut c_void,
            _ => return None,
        };
        NonNull::new(address)
    }
}

/// Loader handing out [`StubLibrary`] instances and counting loads
#[derive(Debug, Default)]
pub struct StubLoader {
    missing: Option<&'static str>,
    fail: bool,
    loads: AtomicUsize,
}

impl StubLoader {
    pub fn without(symbol: &'static str) -> Self {
        Self {
            missing: Some(symbol),
            ..Self::default()
        }
    }

    /// A loader whose every load fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl LibraryLoader for StubLoader {
    fn load(&self, library: &Path) -> Result<&'static dyn NativeLibrary, HostingError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(HostingError::LibraryLoadFailed {
                library: library.display().to_string(),
                reason: "stub loader configured to fail".to_string(),
            });
        }
        let library: &'static StubLibrary = Box::leak(Box::new(StubLibrary {
            missing: self.missing,
        }));
        Ok(library)
    }
}

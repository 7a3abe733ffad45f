//! The `(int, int) -> int` entry point every hosting path ends up producing

use crate::errors::HostingError;
use std::any::Any;
use std::ffi::c_void;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Signature of the exported calculation function.
///
/// Uses the platform calling convention (`stdcall` on 32-bit Windows, C
/// elsewhere), the same one an unmanaged-callers-only managed method uses. The
/// `-unwind` variant lets a Rust panic raised by an in-process callee reach
/// [`Callable::invoke`] instead of aborting.
pub type CalculateFn = unsafe extern "system-unwind" fn(i32, i32) -> i32;

/// A resolved native function pointer into the target environment
///
/// Cheap to copy; the bridge keeps the authoritative copy for the lifetime of
/// the process and consumers borrow it by value.
#[derive(Clone, Copy)]
pub struct Callable {
    func: CalculateFn,
}

impl Callable {
    /// Wrap a typed function pointer.
    ///
    /// # Safety
    ///
    /// `func` must stay valid for as long as the returned value is used and
    /// must be sound to call with any pair of `i32`.
    pub unsafe fn from_fn(func: CalculateFn) -> Self {
        Self { func }
    }

    /// Wrap a raw address returned by a hosting library, `None` when null.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a function with the [`CalculateFn`]
    /// signature that outlives the returned value.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        let func = std::mem::transmute::<*mut c_void, CalculateFn>(ptr);
        Some(Self { func })
    }

    /// Call the function
    pub fn call(&self, a: i32, b: i32) -> i32 {
        // SAFETY: upheld by the constructors.
        unsafe { (self.func)(a, b) }
    }

    /// Call the function, classifying an unwind out of the callee as
    /// `UnexpectedNativeFailure`. Hard faults (access violations) are not
    /// recoverable and still take the process down.
    pub fn invoke(&self, a: i32, b: i32) -> Result<i32, HostingError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.call(a, b)))
            .map_err(|payload| HostingError::UnexpectedNativeFailure(panic_message(&*payload)))
    }

    /// Address of the underlying function, for diagnostics
    pub fn address(&self) -> usize {
        self.func as usize
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for Callable {}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("address", &format_args!("{:#x}", self.address()))
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "callee unwound with a non-string payload".to_string()
    }
}

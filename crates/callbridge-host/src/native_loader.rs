//! Dynamic loading of native hosting libraries
//!
//! Libraries are opened with dlopen (Unix) or LoadLibraryEx (Windows) and are
//! never unloaded: a hosting runtime cannot be torn down and brought back
//! within one process, and every `Callable` it hands out points into it.

use crate::errors::HostingError;
use callbridge_logger as logger;
use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// A loaded native library that can resolve exported symbols by name
pub trait NativeLibrary: fmt::Debug + Send + Sync {
    /// Path or name the library was loaded from
    fn path(&self) -> &Path;

    /// Address of an exported symbol, `None` when it is not exported
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>>;
}

/// Opens native libraries; the seam between the hosting strategies and the OS loader
pub trait LibraryLoader: Send + Sync {
    fn load(&self, library: &Path) -> Result<&'static dyn NativeLibrary, HostingError>;
}

/// Loader backed by the operating system's dynamic linker
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

/// Library handle kept for the lifetime of the process
pub struct SystemLibrary {
    path: PathBuf,
    library: libloading::Library,
}

impl LibraryLoader for SystemLoader {
    fn load(&self, library: &Path) -> Result<&'static dyn NativeLibrary, HostingError> {
        // A bare file name goes through the loader's own search order
        let is_bare_name = library.parent().map_or(true, |p| p.as_os_str().is_empty());
        if !is_bare_name && !library.exists() {
            return Err(HostingError::LibraryLoadFailed {
                library: library.display().to_string(),
                reason: "file not found".to_string(),
            });
        }

        logger::debug(&format!("Loading hosting library: {}", library.display()));

        let handle = open(library).map_err(|e| HostingError::LibraryLoadFailed {
            library: library.display().to_string(),
            reason: e.to_string(),
        })?;

        let loaded: &'static SystemLibrary = Box::leak(Box::new(SystemLibrary {
            path: library.to_path_buf(),
            library: handle,
        }));
        Ok(loaded)
    }
}

/// RTLD_NOW | RTLD_LOCAL: unresolved dependencies fail the load itself.
#[cfg(unix)]
fn open(path: &Path) -> Result<libloading::Library, libloading::Error> {
    use libloading::os::unix::{Library, RTLD_LOCAL, RTLD_NOW};

    let library = unsafe { Library::open(Some(path), RTLD_NOW | RTLD_LOCAL)? };
    Ok(library.into())
}

/// Dependencies of a library given by path resolve from its own directory.
#[cfg(windows)]
fn open(path: &Path) -> Result<libloading::Library, libloading::Error> {
    use libloading::os::windows::{Library, LOAD_WITH_ALTERED_SEARCH_PATH};

    let is_bare_name = path.parent().map_or(true, |p| p.as_os_str().is_empty());
    let library = if is_bare_name {
        unsafe { Library::new(path)? }
    } else {
        unsafe { Library::load_with_flags(path, LOAD_WITH_ALTERED_SEARCH_PATH)? }
    };
    Ok(library.into())
}

impl NativeLibrary for SystemLibrary {
    fn path(&self) -> &Path {
        &self.path
    }

    fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        let symbol = unsafe { self.library.get::<*mut c_void>(name.as_bytes()) }.ok()?;
        NonNull::new(*symbol)
    }
}

impl fmt::Debug for SystemLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

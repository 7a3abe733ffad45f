//! Platform-specific names, separators and string marshalling for the hosting libraries

use crate::errors::HostingError;
use std::env;
use std::ffi::{CString, OsStr};
use std::path::{Component, Path, PathBuf};

/// File name of the legacy hosting library
#[cfg(windows)]
pub const CORECLR_LIBRARY: &str = "coreclr.dll";
#[cfg(target_os = "macos")]
pub const CORECLR_LIBRARY: &str = "libcoreclr.dylib";
#[cfg(not(any(windows, target_os = "macos")))]
pub const CORECLR_LIBRARY: &str = "libcoreclr.so";

/// File name of the modern hosting library
#[cfg(windows)]
pub const HOSTFXR_LIBRARY: &str = "hostfxr.dll";
#[cfg(target_os = "macos")]
pub const HOSTFXR_LIBRARY: &str = "libhostfxr.dylib";
#[cfg(not(any(windows, target_os = "macos")))]
pub const HOSTFXR_LIBRARY: &str = "libhostfxr.so";

/// Managed assemblies carry this extension on every platform
pub const ASSEMBLY_EXTENSION: &str = "dll";

/// Suffix appended to the assembly identifier to find its runtime config
pub const RUNTIME_CONFIG_SUFFIX: &str = ".runtimeconfig.json";

/// Separator the runtime expects between trusted platform assembly paths
#[cfg(windows)]
pub const TPA_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const TPA_SEPARATOR: char = ':';

/// Character type of the modern hosting API (`char_t`)
#[cfg(windows)]
pub type CharT = u16;
#[cfg(not(windows))]
pub type CharT = std::ffi::c_char;

/// Nul-terminated narrow string, as taken by the legacy hosting API
pub(crate) fn narrow(value: &str, what: &str) -> Result<CString, HostingError> {
    CString::new(value).map_err(|_| {
        HostingError::InvalidParameter(format!("{} contains an interior NUL: {:?}", what, value))
    })
}

/// Nul-terminated narrow copy of a path
pub(crate) fn narrow_path(path: &Path, what: &str) -> Result<CString, HostingError> {
    let value = path.to_str().ok_or_else(|| {
        HostingError::InvalidParameter(format!("{} is not valid UTF-8: {}", what, path.display()))
    })?;
    narrow(value, what)
}

/// Nul-terminated `char_t` string for the modern hosting API
///
/// UTF-16 on Windows, the raw OS bytes elsewhere.
#[derive(Debug, Clone)]
pub(crate) struct PalString {
    #[cfg(windows)]
    buf: Vec<u16>,
    #[cfg(not(windows))]
    buf: CString,
}

impl PalString {
    pub(crate) fn new(value: impl AsRef<OsStr>, what: &str) -> Result<Self, HostingError> {
        let value = value.as_ref();
        let invalid = || {
            HostingError::InvalidParameter(format!(
                "{} contains an interior NUL: {:?}",
                what, value
            ))
        };

        #[cfg(windows)]
        {
            use std::os::windows::ffi::OsStrExt;
            let mut buf: Vec<u16> = value.encode_wide().collect();
            if buf.contains(&0) {
                return Err(invalid());
            }
            buf.push(0);
            Ok(Self { buf })
        }

        #[cfg(not(windows))]
        {
            use std::os::unix::ffi::OsStrExt;
            let buf = CString::new(value.as_bytes()).map_err(|_| invalid())?;
            Ok(Self { buf })
        }
    }

    pub(crate) fn as_ptr(&self) -> *const CharT {
        self.buf.as_ptr()
    }
}

/// `path` anchored at the current directory when relative, with `.` components dropped
pub fn absolute_path(path: &Path) -> Result<PathBuf, HostingError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(|e| {
        HostingError::InvalidParameter(format!(
            "cannot resolve relative path {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .fold(cwd, |acc, c| acc.join(c)))
}

/// First directory in `dirs` that contains `file_name`
pub fn find_in_paths<I>(file_name: &str, dirs: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    dirs.into_iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .find(|dir| dir.join(file_name).is_file())
}

/// First directory on `PATH` that contains `file_name`
pub fn find_in_search_path(file_name: &str) -> Option<PathBuf> {
    let search_path = env::var_os("PATH")?;
    find_in_paths(file_name, env::split_paths(&search_path))
}

/// Read back a `char_t` string; used by the in-process stub hosting library
#[cfg(test)]
pub(crate) unsafe fn read_pal(ptr: *const CharT) -> String {
    #[cfg(windows)]
    {
        let mut len = 0;
        while *ptr.add(len) != 0 {
            len += 1;
        }
        String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
    }

    #[cfg(not(windows))]
    {
        std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

//! Direct export lookup for ahead-of-time compiled libraries
//!
//! No handshake: the library exports the calculation function itself.

use crate::callable::Callable;
use crate::errors::HostingError;
use crate::native_loader::LibraryLoader;
use std::path::Path;

/// Default export name of the calculation function
pub const DEFAULT_EXPORT: &str = "calculate";

/// Load `library` and wrap its `symbol` export as a [`Callable`]
pub fn load_export(
    loader: &dyn LibraryLoader,
    library: &Path,
    symbol: &str,
) -> Result<Callable, HostingError> {
    let native = loader.load(library)?;
    let address = native
        .symbol(symbol)
        .ok_or_else(|| HostingError::MissingEntryPoint(symbol.to_string()))?;
    tracing::debug!(symbol, library = %library.display(), "resolved native export");

    // SAFETY: the export is declared with the `(int, int) -> int` signature and
    // the library is never unloaded.
    unsafe { Callable::from_raw(address.as_ptr()) }
        .ok_or_else(|| HostingError::MissingEntryPoint(symbol.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubLoader;

    #[test]
    fn test_load_export_and_call() {
        let loader = StubLoader::default();
        let callable = load_export(&loader, Path::new("libnative.so"), DEFAULT_EXPORT).unwrap();
        assert_eq!(callable.call(1, 1), 2);
        assert_eq!(callable.invoke(3, 4), Ok(7));
    }

    #[test]
    fn test_missing_export() {
        let loader = StubLoader::default();
        let err = load_export(&loader, Path::new("libnative.so"), "multiply").unwrap_err();
        assert_eq!(err, HostingError::MissingEntryPoint("multiply".to_string()));
    }

    #[test]
    fn test_load_failure() {
        let loader = StubLoader::failing();
        let err = load_export(&loader, Path::new("libnative.so"), DEFAULT_EXPORT).unwrap_err();
        assert!(matches!(err, HostingError::LibraryLoadFailed { .. }));
    }
}

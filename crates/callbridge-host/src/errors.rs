use thiserror::Error;

/// Errors that can occur while bringing up a hosting protocol or calling into it
///
/// Native status codes are kept verbatim (HRESULT-style `i32`) and rendered
/// as `0x%08x`, so `0x80004005` reads the same here as in the runtime's logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostingError {
    #[error("Failed to load hosting library '{library}': {reason}")]
    LibraryLoadFailed { library: String, reason: String },

    #[error("Hosting library does not export required entry point '{0}'")]
    MissingEntryPoint(String),

    #[error("Hosting step '{step}' failed with status {code:#010x}")]
    InitializationFailed { step: &'static str, code: i32 },

    #[error("Failed to create managed delegate, status {0:#010x}")]
    DelegateCreationFailed(i32),

    #[error("Hosting bridge has not been initialized")]
    NotInitialized,

    #[error("Unexpected failure inside native call: {0}")]
    UnexpectedNativeFailure(String),

    #[error("Invalid hosting parameter: {0}")]
    InvalidParameter(String),
}

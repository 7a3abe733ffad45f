//! Error types for the CLI's own operations
//!
//! Hosting and configuration failures keep their library error types; these
//! cover what only the CLI does.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from locating a library by file name pattern
#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("Invalid library pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read directory {}: {source}", .dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No file matching '{pattern}' in {}", .dir.display())]
    NoMatch { pattern: String, dir: PathBuf },
}

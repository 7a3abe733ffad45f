//! Library discovery by file name pattern
//!
//! Returns the first directory entry whose whole file name matches. Directory
//! iteration order is whatever the filesystem yields, so with several matches
//! the winner is not stable across systems.

use crate::errors::LocatorError;
use callbridge_logger as logger;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Compile `pattern` and find the first file in `dir` whose name it matches in full
pub fn locate(dir: &Path, pattern: &str) -> Result<PathBuf, LocatorError> {
    let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
        LocatorError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    })?;
    find_first(dir, &regex, pattern)
}

fn find_first(dir: &Path, regex: &Regex, pattern: &str) -> Result<PathBuf, LocatorError> {
    let io_error = |source| LocatorError::Io {
        dir: dir.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let name = entry.file_name();
        if regex.is_match(&name.to_string_lossy()) {
            logger::debug(&format!("Located library: {}", entry.path().display()));
            return Ok(entry.path());
        }
    }

    Err(LocatorError::NoMatch {
        pattern: pattern.to_string(),
        dir: dir.to_path_buf(),
    })
}

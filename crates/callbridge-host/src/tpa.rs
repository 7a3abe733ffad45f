//! Trusted platform assembly list for the legacy hosting protocol

use crate::errors::HostingError;
use crate::utils::{ASSEMBLY_EXTENSION, TPA_SEPARATOR};
use callbridge_logger as logger;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Property key the legacy initializer reads the list from
pub const TRUSTED_PLATFORM_ASSEMBLIES: &str = "TRUSTED_PLATFORM_ASSEMBLIES";

/// Ordered assembly paths: the target assembly first, then the runtime's own
///
/// Entries are kept exactly as found, duplicates included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedAssemblyList {
    entries: Vec<PathBuf>,
}

impl TrustedAssemblyList {
    /// A list holding only the target assembly
    pub fn new(target_assembly: &Path) -> Self {
        Self {
            entries: vec![target_assembly.to_path_buf()],
        }
    }

    /// Target assembly followed by every assembly among `runtime_files`, in the given order
    ///
    /// Runtime files whose path is not valid UTF-8 are skipped.
    pub fn from_entries<I>(target_assembly: &Path, runtime_files: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut list = Self::new(target_assembly);
        for path in runtime_files.into_iter().filter(|path| is_assembly(path)) {
            if path.to_str().is_none() {
                logger::warn(&format!(
                    "Skipping runtime assembly with a non UTF-8 path: {}",
                    path.display()
                ));
                continue;
            }
            list.entries.push(path);
        }
        list
    }

    /// Target assembly followed by the assemblies of `runtime_dir`, in directory scan order
    pub fn scan(target_assembly: &Path, runtime_dir: &Path) -> io::Result<Self> {
        let mut files = Vec::new();
        for entry in fs::read_dir(runtime_dir)? {
            let entry = entry?;
            if entry.file_type().is_ok_and(|t| !t.is_dir()) {
                files.push(entry.path());
            }
        }
        Ok(Self::from_entries(target_assembly, files))
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry followed by `separator`, including the last
    pub fn join_with(&self, separator: char) -> Result<String, HostingError> {
        let mut joined = String::new();
        for entry in &self.entries {
            let entry = entry.to_str().ok_or_else(|| {
                HostingError::InvalidParameter(format!(
                    "trusted assembly path is not valid UTF-8: {}",
                    entry.display()
                ))
            })?;
            joined.push_str(entry);
            joined.push(separator);
        }
        Ok(joined)
    }

    /// Value for the `TRUSTED_PLATFORM_ASSEMBLIES` property
    pub fn to_property_value(&self) -> Result<String, HostingError> {
        self.join_with(TPA_SEPARATOR)
    }
}

fn is_assembly(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ASSEMBLY_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_target_first_and_non_assemblies_excluded() {
        let list = TrustedAssemblyList::from_entries(
            Path::new("X.dll"),
            vec![
                PathBuf::from("a.dll"),
                PathBuf::from("b.dll"),
                PathBuf::from("notes.txt"),
            ],
        );
        assert_eq!(list.join_with(';').unwrap(), "X.dll;a.dll;b.dll;");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let list = TrustedAssemblyList::from_entries(
            Path::new("X.dll"),
            vec![
                PathBuf::from("a.dll"),
                PathBuf::from("b.dll"),
                PathBuf::from("a.dll"),
            ],
        );
        assert_eq!(list.len(), 4);
        assert_eq!(list.join_with(';').unwrap(), "X.dll;a.dll;b.dll;a.dll;");
    }

    #[test]
    fn test_property_value_uses_platform_separator() {
        let list = TrustedAssemblyList::from_entries(Path::new("X.dll"), vec![PathBuf::from("a.dll")]);
        assert_eq!(
            list.to_property_value().unwrap(),
            format!("X.dll{sep}a.dll{sep}", sep = TPA_SEPARATOR)
        );
    }

    #[test]
    fn test_scan_runtime_dir() {
        let dir = TempDir::new().unwrap();
        for name in ["a.dll", "b.dll", "notes.txt", "A.dll"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.dll")).unwrap();

        let target = Path::new("/app/X.dll");
        let list = TrustedAssemblyList::scan(target, dir.path()).unwrap();

        assert_eq!(list.entries()[0], target);
        let mut runtime: Vec<String> = list.entries()[1..]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        runtime.sort();
        // Case variants are distinct files on case-sensitive filesystems
        let expected: Vec<&str> = if dir.path().join("a.dll").exists()
            && fs::read_dir(dir.path()).unwrap().count() == 5
        {
            vec!["A.dll", "a.dll", "b.dll"]
        } else {
            vec!["a.dll", "b.dll"]
        };
        assert_eq!(runtime, expected);
    }

    #[test]
    fn test_scan_missing_dir() {
        let err = TrustedAssemblyList::scan(Path::new("X.dll"), Path::new("/nonexistent/runtime"));
        assert!(err.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let bad = PathBuf::from(OsStr::from_bytes(b"/rt/bad\xff.dll"));
        let list = TrustedAssemblyList::from_entries(
            Path::new("X.dll"),
            vec![PathBuf::from("a.dll"), bad.clone()],
        );
        assert_eq!(list.join_with(';').unwrap(), "X.dll;a.dll;");

        let err = TrustedAssemblyList::new(&bad).to_property_value().unwrap_err();
        assert!(matches!(err, HostingError::InvalidParameter(_)));
    }
}

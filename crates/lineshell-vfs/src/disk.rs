//! Disk-backed collaborators over `std::fs`.

use std::io;
use std::path::{Path, PathBuf};

use lineshell_types::{Result, ShellError};

use crate::{DirectoryLister, FileEntry, FileTextLoader, has_extension};

/// Loads and lists files on the local file system.
///
/// Names are tried as given first, then relative to each search path in
/// order.
#[derive(Debug, Clone, Default)]
pub struct DiskFs {
    search_paths: Vec<PathBuf>,
}

impl DiskFs {
    /// Create a loader with no extra search paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader that also searches the given directories.
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// First existing file for `name`, if any.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let direct = Path::new(name);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }
        if direct.is_absolute() {
            return None;
        }
        self.search_paths
            .iter()
            .map(|root| root.join(name))
            .find(|candidate| candidate.is_file())
    }
}

impl FileTextLoader for DiskFs {
    fn load(&self, name: &str) -> Result<String> {
        let path = self
            .resolve(name)
            .ok_or_else(|| ShellError::NotFound(name.to_string()))?;
        log::debug!("Loading {}", path.display());
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => {
                ShellError::Script(format!("{}: not valid UTF-8", path.display()))
            },
            _ => ShellError::Io(e),
        })
    }
}

impl DirectoryLister for DiskFs {
    fn list(&self, dir: &str, extension: &str) -> Result<Vec<FileEntry>> {
        let read = std::fs::read_dir(dir).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ShellError::NotFound(dir.to_string()),
            _ => ShellError::Io(e),
        })?;
        let mut entries: Vec<FileEntry> = read
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let meta = e.metadata().ok()?;
                if !meta.is_file() {
                    return None;
                }
                let name = e.file_name().to_string_lossy().into_owned();
                has_extension(&name, extension).then(|| FileEntry {
                    name,
                    path: e.path().to_string_lossy().into_owned(),
                    size: meta.len(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_by_direct_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boot.ssc");
        std::fs::write(&path, "help\nexit\n").unwrap();
        let fs = DiskFs::new();
        let text = fs.load(path.to_str().unwrap()).unwrap();
        assert_eq!(text, "help\nexit\n");
    }

    #[test]
    fn load_through_search_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("setup.ssc"), "wait 1").unwrap();
        let fs = DiskFs::with_search_paths(vec![
            PathBuf::from("/nonexistent/lineshell"),
            dir.path().to_path_buf(),
        ]);
        assert_eq!(fs.load("setup.ssc").unwrap(), "wait 1");
    }

    #[test]
    fn load_missing_is_not_found() {
        let fs = DiskFs::new();
        let err = fs.load("/nonexistent/lineshell/none.ssc").unwrap_err();
        assert!(matches!(err, ShellError::NotFound(_)));
    }

    #[test]
    fn load_invalid_utf8_is_script_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.ssc");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = DiskFs::new().load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ShellError::Script(_)));
    }

    #[test]
    fn list_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zeta.ssc"), "a").unwrap();
        std::fs::write(dir.path().join("alpha.ssc"), "abc").unwrap();
        std::fs::write(dir.path().join("readme.md"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub.ssc")).unwrap();
        let entries = DiskFs::new()
            .list(dir.path().to_str().unwrap(), "ssc")
            .unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.ssc", "zeta.ssc"]);
        assert_eq!(entries[0].size, 3);
    }

    #[test]
    fn list_missing_dir_is_not_found() {
        let err = DiskFs::new()
            .list("/nonexistent/lineshell", "ssc")
            .unwrap_err();
        assert!(matches!(err, ShellError::NotFound(_)));
    }
}

//! File collaborators consumed by the shell engine.
//!
//! The engine never touches the file system directly. Script text comes from
//! a [`FileTextLoader`] and script directories are scanned through a
//! [`DirectoryLister`]. [`DiskFs`] implements both over `std::fs`,
//! [`MemoryFs`] over an in-memory tree for tests and embedding.

mod disk;
mod memory;

pub use disk::DiskFs;
pub use memory::MemoryFs;

use lineshell_types::Result;

/// A file reported by a [`DirectoryLister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File name without directory.
    pub name: String,
    /// Path the file can be loaded from.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
}

/// Loads the full text of a named file.
pub trait FileTextLoader: Send + Sync {
    /// Return the file content, or a descriptive error.
    fn load(&self, name: &str) -> Result<String>;
}

/// Lists the files of a directory that carry a given extension.
pub trait DirectoryLister: Send + Sync {
    /// Return matching entries sorted by name.
    ///
    /// `extension` is given without the leading dot.
    fn list(&self, dir: &str, extension: &str) -> Result<Vec<FileEntry>>;
}

/// Whether `name` ends in `.extension`.
pub fn has_extension(name: &str, extension: &str) -> bool {
    name.strip_suffix(extension)
        .is_some_and(|stem| stem.len() > 1 && stem.ends_with('.'))
}

//! In-memory script tree for tests and embedded shells.
//!
//! Nodes are keyed by normalized absolute path; relative names resolve
//! against `/`.

use std::collections::BTreeMap;

use lineshell_types::{Result, ShellError};

use crate::{DirectoryLister, FileEntry, FileTextLoader, has_extension};

#[derive(Debug, Clone)]
enum Node {
    File(String),
    Dir,
}

/// A fully in-memory file tree.
#[derive(Debug)]
pub struct MemoryFs {
    nodes: BTreeMap<String, Node>,
}

impl MemoryFs {
    /// Create a tree holding only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self { nodes }
    }

    /// Create a directory, including missing parents.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        match self.nodes.get(&path) {
            Some(Node::Dir) => return Ok(()),
            Some(Node::File(_)) => {
                return Err(ShellError::Config(format!("file exists: {path}")));
            },
            None => {},
        }
        let par = parent(&path).to_string();
        if par != path {
            self.mkdir(&par)?;
        }
        self.nodes.insert(path, Node::Dir);
        Ok(())
    }

    /// Write a text file, creating parent directories as needed.
    pub fn write(&mut self, path: &str, text: &str) -> Result<()> {
        let path = normalize(path);
        if matches!(self.nodes.get(&path), Some(Node::Dir)) {
            return Err(ShellError::Config(format!("is a directory: {path}")));
        }
        self.mkdir(parent(&path))?;
        self.nodes.insert(path, Node::File(text.to_string()));
        Ok(())
    }

    /// Whether a file or directory exists at `path`.
    pub fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(&normalize(path))
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a path: leading `/`, no empty or `.` components, `..` folded.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Return the parent of a normalized path.
fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

impl FileTextLoader for MemoryFs {
    fn load(&self, name: &str) -> Result<String> {
        let path = normalize(name);
        match self.nodes.get(&path) {
            Some(Node::File(text)) => Ok(text.clone()),
            Some(Node::Dir) => Err(ShellError::Script(format!("is a directory: {path}"))),
            None => Err(ShellError::NotFound(name.to_string())),
        }
    }
}

impl DirectoryLister for MemoryFs {
    fn list(&self, dir: &str, extension: &str) -> Result<Vec<FileEntry>> {
        let path = normalize(dir);
        match self.nodes.get(&path) {
            Some(Node::Dir) => {},
            Some(Node::File(_)) => {
                return Err(ShellError::Script(format!("not a directory: {path}")));
            },
            None => return Err(ShellError::NotFound(dir.to_string())),
        }

        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        // Sorted keys: children come out by name.
        let mut entries = Vec::new();
        for (key, node) in self.nodes.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            let rest = &key[prefix.len()..];
            if rest.is_empty() || rest.contains('/') {
                continue;
            }
            if let Node::File(text) = node
                && has_extension(rest, extension)
            {
                entries.push(FileEntry {
                    name: rest.to_string(),
                    path: key.clone(),
                    size: text.len() as u64,
                });
            }
        }
        Ok(entries)
    }
}

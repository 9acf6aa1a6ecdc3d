//! Directory-backed object store: one file per key, directly under the root.
//!
//! Writes go through a temp file and a rename, so a reader never sees a
//! half-written snapshot.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::ObjectStore;
use crate::error::{Error, Result};

pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(Error::Config(format!("'{key}' is not a valid object key")));
        }
        Ok(self.root.join(key))
    }
}

fn atomic_write(target: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io("create store directory", parent, e))?;
    }

    let temp = target.with_extension("tmp");
    fs::write(&temp, content).map_err(|e| Error::io("write temp object", &temp, e))?;
    fs::rename(&temp, target).map_err(|e| Error::io("rename temp object", target, e))?;
    Ok(())
}

impl ObjectStore for DirStore {
    fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        atomic_write(&self.path_for(key)?, body)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io("read object", path, e)),
        }
    }

    fn list(&self, from: &str) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io("list store directory", &self.root, e)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io("list store directory", &self.root, e))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.ends_with(".tmp") || name.starts_with('.') || name.as_str() < from {
                continue;
            }
            keys.push(name);
        }

        keys.sort();
        Ok(keys)
    }

    fn location(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}

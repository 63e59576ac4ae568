//! Temporary files and directories
//!
//! Handles created here are persisted by default. Call `delete_on_drop(true)` to
//! have the file or directory removed when the handle is dropped.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::TemporaryError;

const DEFAULT_PREFIX: &str = "coffer-";

#[derive(Debug, Clone)]
pub struct TemporaryStorage {
    root: PathBuf,
    prefix: String,
}

impl Default for TemporaryStorage {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl TemporaryStorage {
    /// Temporary storage in the system temp directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Temporary storage under `root` instead of the system temp directory.
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create an empty file, opened for reading and writing.
    pub fn create_file(&self) -> Result<TemporaryFile, TemporaryError> {
        let named = tempfile::Builder::new()
            .prefix(&self.prefix)
            .tempfile_in(&self.root)
            .map_err(|source| TemporaryError::Create {
                kind: "file",
                source,
            })?;

        let (file, path) = named.keep().map_err(|e| TemporaryError::Create {
            kind: "file",
            source: e.error,
        })?;

        tracing::debug!(path = %path.display(), "Temporary file created");

        Ok(TemporaryFile {
            path,
            file: Some(file),
            delete_on_drop: false,
        })
    }

    pub fn create_directory(&self) -> Result<TemporaryDirectory, TemporaryError> {
        let dir = tempfile::Builder::new()
            .prefix(&self.prefix)
            .tempdir_in(&self.root)
            .map_err(|source| TemporaryError::Create {
                kind: "directory",
                source,
            })?;

        #[allow(deprecated)]
        let path = dir.into_path();

        tracing::debug!(path = %path.display(), "Temporary directory created");

        Ok(TemporaryDirectory {
            path,
            delete_on_drop: false,
        })
    }
}

#[derive(Debug)]
pub struct TemporaryFile {
    path: PathBuf,
    file: Option<File>,
    delete_on_drop: bool,
}

impl TemporaryFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> Option<&File> {
        self.file.as_ref()
    }

    pub fn file_mut(&mut self) -> Option<&mut File> {
        self.file.as_mut()
    }

    /// Close the open handle, keeping the file on disk.
    pub fn close(&mut self) {
        self.file = None;
    }

    pub fn delete_on_drop(mut self, delete: bool) -> Self {
        self.delete_on_drop = delete;
        self
    }

    pub fn set_delete_on_drop(&mut self, delete: bool) {
        self.delete_on_drop = delete;
    }
}

impl Drop for TemporaryFile {
    fn drop(&mut self) {
        self.file = None;
        if self.delete_on_drop {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(error = %e, path = %self.path.display(), "Failed to remove temporary file");
            }
        }
    }
}

#[derive(Debug)]
pub struct TemporaryDirectory {
    path: PathBuf,
    delete_on_drop: bool,
}

impl TemporaryDirectory {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn delete_on_drop(mut self, delete: bool) -> Self {
        self.delete_on_drop = delete;
        self
    }

    pub fn set_delete_on_drop(&mut self, delete: bool) {
        self.delete_on_drop = delete;
    }
}

impl Drop for TemporaryDirectory {
    fn drop(&mut self) {
        if self.delete_on_drop {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                tracing::warn!(error = %e, path = %self.path.display(), "Failed to remove temporary directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};

    #[test]
    fn test_file_is_read_write() {
        let root = tempfile::tempdir().unwrap();
        let storage = TemporaryStorage::in_dir(root.path());

        let mut temp = storage.create_file().unwrap().delete_on_drop(true);
        assert!(temp.path().starts_with(root.path()));

        let file = temp.file_mut().unwrap();
        file.write_all(b"scratch").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "scratch");
    }

    #[test]
    fn test_file_delete_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let storage = TemporaryStorage::in_dir(root.path());

        let deleted = storage.create_file().unwrap().delete_on_drop(true);
        let deleted_path = deleted.path().to_path_buf();
        let kept = storage.create_file().unwrap();
        let kept_path = kept.path().to_path_buf();
        assert!(deleted_path.exists());

        drop(deleted);
        drop(kept);

        assert!(!deleted_path.exists());
        assert!(kept_path.exists());
    }

    #[test]
    fn test_directory_delete_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let storage = TemporaryStorage::in_dir(root.path()).with_prefix("job-");

        let deleted = storage.create_directory().unwrap().delete_on_drop(true);
        let deleted_path = deleted.path().to_path_buf();
        fs::write(deleted_path.join("inner.txt"), "x").unwrap();

        let kept = storage.create_directory().unwrap();
        let kept_path = kept.path().to_path_buf();
        assert!(kept_path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("job-")));

        drop(deleted);
        drop(kept);

        assert!(!deleted_path.exists());
        assert!(kept_path.is_dir());
    }

    #[test]
    fn test_create_in_missing_root_fails() {
        let root = tempfile::tempdir().unwrap();
        let storage = TemporaryStorage::in_dir(root.path().join("missing"));

        assert!(matches!(
            storage.create_file(),
            Err(TemporaryError::Create { kind: "file", .. })
        ));
        assert!(matches!(
            storage.create_directory(),
            Err(TemporaryError::Create { kind: "directory", .. })
        ));
    }
}

//! Filesystem-backed document store.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use crate::ports::store::{file_name, DirEntry, DocumentStore, StoreError};

/// Stores documents as `<dir>/<name>.yaml` files on disk.
///
/// Paths containing `..` are refused.
#[derive(Debug, Default)]
pub struct LiveDocumentStore;

fn checked(dir: &Path, name: Option<&str>) -> Result<PathBuf, StoreError> {
    if dir.components().any(|c| c == Component::ParentDir) {
        return Err(StoreError::InvalidPath { path: dir.to_path_buf(), reason: "parent directory reference" });
    }
    let Some(name) = name else {
        return Ok(dir.to_path_buf());
    };
    let path = dir.join(file_name(name));
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(StoreError::InvalidPath { path, reason: "document name must be a plain file name" });
    }
    Ok(path)
}

fn io_error(path: PathBuf, source: std::io::Error) -> StoreError {
    if source.kind() == ErrorKind::NotFound {
        StoreError::NotFound(path)
    } else {
        StoreError::Io { path, source }
    }
}

impl DocumentStore for LiveDocumentStore {
    fn read(&self, dir: &Path, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = checked(dir, Some(name))?;
        std::fs::read(&path).map_err(|e| io_error(path, e))
    }

    fn write(&self, dir: &Path, name: &str, data: &[u8], append: bool) -> Result<(), StoreError> {
        let path = checked(dir, Some(name))?;
        std::fs::create_dir_all(dir).map_err(|e| io_error(dir.to_path_buf(), e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(|e| io_error(path.clone(), e))?;
        file.write_all(data).map_err(|e| io_error(path, e))
    }

    fn read_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, StoreError> {
        let dir = checked(dir, None)?;
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| io_error(dir.clone(), e))? {
            let entry = entry.map_err(|e| io_error(dir.clone(), e))?;
            let is_dir = entry.file_type().map_err(|e| io_error(entry.path(), e))?.is_dir();
            if let Some(name) = entry.file_name().to_str() {
                entries.push(DirEntry { name: name.to_string(), is_dir });
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn remove(&self, dir: &Path, name: &str) -> Result<(), StoreError> {
        let path = checked(dir, Some(name))?;
        std::fs::remove_file(&path).map_err(|e| io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_append_read_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("test-set-0");
        let store = LiveDocumentStore;

        store.write(&dir, "mocks", b"a\n", false).unwrap();
        store.write(&dir, "mocks", b"b\n", true).unwrap();
        assert_eq!(store.read(&dir, "mocks").unwrap(), b"a\nb\n");
        assert!(dir.join("mocks.yaml").exists());

        store.write(&dir, "mocks", b"c\n", false).unwrap();
        assert_eq!(store.read(&dir, "mocks").unwrap(), b"c\n");

        store.remove(&dir, "mocks").unwrap();
        assert!(store.read(&dir, "mocks").unwrap_err().is_not_found());
    }

    #[test]
    fn listing_marks_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LiveDocumentStore;
        store.write(&tmp.path().join("test-set-1"), "mocks", b"", false).unwrap();
        store.write(tmp.path(), "config", b"", false).unwrap();
        let entries = store.read_dir(tmp.path()).unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry { name: "config.yaml".into(), is_dir: false },
                DirEntry { name: "test-set-1".into(), is_dir: true },
            ]
        );
    }

    #[test]
    fn missing_directory_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = LiveDocumentStore.read_dir(&tmp.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn parent_references_are_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LiveDocumentStore;
        let err = store.read(&tmp.path().join("..").join("x"), "mocks").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
        let err = store.write(tmp.path(), "../escape", b"", false).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
    }
}

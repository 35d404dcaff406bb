//! Document store held in a map.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::ports::store::{file_name, DirEntry, DocumentStore, StoreError};

/// Keeps documents in memory, keyed by their full path.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every stored path, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files().keys().cloned().collect()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn read(&self, dir: &Path, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = dir.join(file_name(name));
        self.files().get(&path).cloned().ok_or(StoreError::NotFound(path))
    }

    fn write(&self, dir: &Path, name: &str, data: &[u8], append: bool) -> Result<(), StoreError> {
        let path = dir.join(file_name(name));
        let mut files = self.files();
        let file = files.entry(path).or_default();
        if !append {
            file.clear();
        }
        file.extend_from_slice(data);
        Ok(())
    }

    fn read_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, StoreError> {
        let mut entries = BTreeSet::new();
        for path in self.files().keys() {
            let Ok(rest) = path.strip_prefix(dir) else { continue };
            let mut parts = rest.components();
            let (Some(first), more) = (parts.next(), parts.next().is_some()) else { continue };
            if let Some(name) = first.as_os_str().to_str() {
                entries.insert(DirEntry { name: name.to_string(), is_dir: more });
            }
        }
        if entries.is_empty() {
            return Err(StoreError::NotFound(dir.to_path_buf()));
        }
        Ok(entries.into_iter().collect())
    }

    fn remove(&self, dir: &Path, name: &str) -> Result<(), StoreError> {
        let path = dir.join(file_name(name));
        self.files().remove(&path).map(|_| ()).ok_or(StoreError::NotFound(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaves_like_a_directory_tree() {
        let store = MemoryDocumentStore::new();
        let root = Path::new("keploy");
        store.write(&root.join("test-set-0"), "mocks", b"a", false).unwrap();
        store.write(&root.join("test-set-0").join("tests"), "test-1", b"t", false).unwrap();
        store.write(&root.join("test-set-0"), "mocks", b"b", true).unwrap();

        assert_eq!(store.read(&root.join("test-set-0"), "mocks").unwrap(), b"ab");
        assert_eq!(
            store.read_dir(&root.join("test-set-0")).unwrap(),
            vec![
                DirEntry { name: "mocks.yaml".into(), is_dir: false },
                DirEntry { name: "tests".into(), is_dir: true },
            ]
        );
        assert_eq!(store.read_dir(root).unwrap(), vec![DirEntry { name: "test-set-0".into(), is_dir: true }]);
        assert!(store.read_dir(Path::new("elsewhere")).unwrap_err().is_not_found());

        store.remove(&root.join("test-set-0"), "mocks").unwrap();
        assert!(store.read(&root.join("test-set-0"), "mocks").unwrap_err().is_not_found());
    }
}

//! Persistence gateway for YAML documents.

use std::path::{Path, PathBuf};

/// Extension appended to every document name.
pub const DOCUMENT_EXTENSION: &str = "yaml";

/// Failure reported by a [`DocumentStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The document or directory does not exist.
    #[error("{0} not found")]
    NotFound(PathBuf),

    /// The path was refused before touching storage.
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// Offending path.
        path: PathBuf,
        /// Why it was refused.
        reason: &'static str,
    },

    /// The backing storage failed.
    #[error("i/o error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// `true` when the target does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    /// File or directory name.
    pub name: String,
    /// `true` for directories.
    pub is_dir: bool,
}

/// Reads and writes `<dir>/<name>.yaml` documents.
///
/// Abstracting storage keeps the mock and test-case databases testable
/// without touching the real disk.
pub trait DocumentStore: Send + Sync {
    /// Reads a whole document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the document does not exist.
    fn read(&self, dir: &Path, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Writes a document, creating parent directories. With `append` the
    /// data is added to the end of an existing document.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write(&self, dir: &Path, name: &str, data: &[u8], append: bool) -> Result<(), StoreError>;

    /// Lists a directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the directory does not exist.
    fn read_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, StoreError>;

    /// Deletes a document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the document does not exist.
    fn remove(&self, dir: &Path, name: &str) -> Result<(), StoreError>;
}

/// File name of a document.
#[must_use]
pub fn file_name(name: &str) -> String {
    format!("{name}.{DOCUMENT_EXTENSION}")
}

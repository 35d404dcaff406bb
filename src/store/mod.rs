//! Mock and test-case databases on top of the document store.
//!
//! All I/O goes through `ctx.store`, so the databases work with the live
//! filesystem adapter and the in-memory adapter alike. Directory layout:
//!
//! ```text
//! <root>/
//!   └── test-set-0/
//!         ├── <mock_file>.yaml     multi-document stream of mocks
//!         └── tests/
//!               └── test-1.yaml    one test case per file
//! ```

pub mod mockdb;
pub mod session;
pub mod testdb;

use std::path::Path;

use crate::error::Error;
use crate::ports::store::{file_name, StoreError};

pub use mockdb::MockDb;
pub use session::Sessions;
pub use testdb::TestDb;

fn store_error(dir: &Path, name: &str, err: &StoreError) -> Error {
    Error::store(dir.join(file_name(name)).display().to_string(), err)
}

fn index_of(name: &str, prefix: &str) -> Option<u64> {
    name.strip_prefix(prefix)?.parse().ok()
}

/// Index after the highest `<prefix>N` in `names`, or `first` when none
/// carries the prefix. Gaps left by deletions are never reused.
fn next_index<'n>(names: impl IntoIterator<Item = &'n str>, prefix: &str, first: u64) -> u64 {
    names
        .into_iter()
        .filter_map(|name| index_of(name, prefix))
        .max()
        .map_or(first, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_index_follows_the_highest() {
        assert_eq!(next_index(["mock-0", "mock-7", "mock-3"], "mock-", 0), 8);
        assert_eq!(next_index(["test-2"], "test-", 1), 3);
    }

    #[test]
    fn unrelated_names_are_ignored() {
        assert_eq!(next_index(["scratch", "mock-x", "test-set-4"], "test-", 1), 1);
        assert_eq!(next_index(std::iter::empty(), "mock-", 0), 0);
    }
}

//! Test-set discovery and naming.

use std::path::{Path, PathBuf};

use super::{index_of, next_index};
use crate::context::ServiceContext;
use crate::error::{Error, Result};

/// Prefix of every test-set directory.
pub const TEST_SET_PREFIX: &str = "test-set-";

/// Lists and names the `test-set-N` directories under a root.
pub struct Sessions<'a> {
    ctx: &'a ServiceContext,
    root: PathBuf,
}

impl<'a> Sessions<'a> {
    /// Creates a view of `root`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, root: &Path) -> Self {
        Self { ctx, root: root.to_path_buf() }
    }

    /// Test-set names ordered by their index. Directories that do not
    /// follow the `test-set-N` pattern are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be listed. A missing root has
    /// no test sets.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match self.ctx.store.read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(Error::store(self.root.display().to_string(), e)),
        };
        let mut sets: Vec<(u64, String)> = entries
            .into_iter()
            .filter(|entry| entry.is_dir)
            .filter_map(|entry| index_of(&entry.name, TEST_SET_PREFIX).map(|i| (i, entry.name)))
            .collect();
        sets.sort();
        Ok(sets.into_iter().map(|(_, name)| name).collect())
    }

    /// Name for the next recording session.
    ///
    /// # Errors
    ///
    /// See [`Sessions::list`].
    pub fn next_name(&self) -> Result<String> {
        let sets = self.list()?;
        let next = next_index(sets.iter().map(String::as_str), TEST_SET_PREFIX, 0);
        Ok(format!("{TEST_SET_PREFIX}{next}"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn sets_are_ordered_numerically() {
        let ctx = ServiceContext::in_memory(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let root = Path::new("keploy");
        for set in ["test-set-10", "test-set-2", "scratch"] {
            ctx.store.write(&root.join(set), "mocks", b"", false).unwrap();
        }
        let sessions = Sessions::new(&ctx, root);
        assert_eq!(sessions.list().unwrap(), ["test-set-2", "test-set-10"]);
        assert_eq!(sessions.next_name().unwrap(), "test-set-11");
    }

    #[test]
    fn empty_root_starts_at_zero() {
        let ctx = ServiceContext::in_memory(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(Sessions::new(&ctx, Path::new("keploy")).next_name().unwrap(), "test-set-0");
    }
}

//! Test-case persistence: one document per test case.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{next_index, store_error};
use crate::context::ServiceContext;
use crate::document::stream::{parse_stream, render_document};
use crate::document::{decode_test_case, encode_test_case, NetworkTrafficDoc};
use crate::error::{Error, Result};
use crate::models::TestCase;
use crate::ports::store::DOCUMENT_EXTENSION;

const TESTS_DIR: &str = "tests";

/// Prefix of recorder-assigned test-case names.
pub const TEST_PREFIX: &str = "test-";

/// Stores test cases under `<root>/<test-set>/tests/<name>.yaml`.
pub struct TestDb<'a> {
    ctx: &'a ServiceContext,
    root: PathBuf,
}

impl<'a> TestDb<'a> {
    /// Creates a database rooted at `root`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, root: &Path) -> Self {
        Self { ctx, root: root.to_path_buf() }
    }

    fn tests_dir(&self, test_set: &str) -> PathBuf {
        self.root.join(test_set).join(TESTS_DIR)
    }

    fn write(&self, test_set: &str, tc: &TestCase) -> Result<()> {
        let dir = self.tests_dir(test_set);
        let data = render_document(&encode_test_case(tc)?, &format!("test case {}", tc.name))?;
        self.ctx
            .store
            .write(&dir, &tc.name, data.as_bytes(), false)
            .map_err(|e| store_error(&dir, &tc.name, &e))
    }

    /// Records a new test case.
    ///
    /// # Errors
    ///
    /// Returns an error if a test case with that name already exists or
    /// the write fails.
    pub fn insert_test_case(&self, test_set: &str, tc: &TestCase) -> Result<()> {
        let dir = self.tests_dir(test_set);
        if self.ctx.store.read(&dir, &tc.name).is_ok() {
            return Err(Error::store(dir.join(&tc.name).display().to_string(), "test case already exists"));
        }
        self.write(test_set, tc)?;
        debug!(test_set, test_case = %tc.name, "recorded test case");
        Ok(())
    }

    /// Overwrites an existing test case, e.g. after editing its noise.
    ///
    /// # Errors
    ///
    /// Returns an error if the test case does not exist or the write fails.
    pub fn update_test_case(&self, test_set: &str, tc: &TestCase) -> Result<()> {
        let dir = self.tests_dir(test_set);
        self.ctx.store.read(&dir, &tc.name).map_err(|e| store_error(&dir, &tc.name, &e))?;
        self.write(test_set, tc)
    }

    /// Loads one test case.
    ///
    /// # Errors
    ///
    /// Returns an error if it is missing or malformed.
    pub fn get_test_case(&self, test_set: &str, name: &str) -> Result<TestCase> {
        let dir = self.tests_dir(test_set);
        let bytes = self.ctx.store.read(&dir, name).map_err(|e| store_error(&dir, name, &e))?;
        let doc = parse_stream::<NetworkTrafficDoc>(&bytes, name)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::store(dir.join(name).display().to_string(), "empty document"))?;
        decode_test_case(doc)
    }

    /// Lists test-case names, sorted. A test set without a `tests`
    /// directory has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub fn list(&self, test_set: &str) -> Result<Vec<String>> {
        let dir = self.tests_dir(test_set);
        let entries = match self.ctx.store.read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(Error::store(dir.display().to_string(), e)),
        };
        let suffix = format!(".{DOCUMENT_EXTENSION}");
        Ok(entries
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .filter_map(|entry| entry.name.strip_suffix(&suffix).map(String::from))
            .collect())
    }

    /// Next free `test-N` name, numbered from 1.
    ///
    /// # Errors
    ///
    /// See [`TestDb::list`].
    pub fn next_test_name(&self, test_set: &str) -> Result<String> {
        let names = self.list(test_set)?;
        let next = next_index(names.iter().map(String::as_str), TEST_PREFIX, 1);
        Ok(format!("{TEST_PREFIX}{next}"))
    }

    /// Loads every test case of a test set.
    ///
    /// # Errors
    ///
    /// Returns the first load failure.
    pub fn get_test_cases(&self, test_set: &str) -> Result<Vec<TestCase>> {
        self.list(test_set)?.iter().map(|name| self.get_test_case(test_set, name)).collect()
    }

    /// Deletes one test case.
    ///
    /// # Errors
    ///
    /// Returns an error if it does not exist.
    pub fn delete_test_case(&self, test_set: &str, name: &str) -> Result<()> {
        let dir = self.tests_dir(test_set);
        self.ctx.store.remove(&dir, name).map_err(|e| store_error(&dir, name, &e))
    }

    /// Deletes every test case whose anchors contain all of `filter`'s
    /// key/value pairs. Returns the deleted names.
    ///
    /// # Errors
    ///
    /// Returns the first load or delete failure.
    pub fn delete_by_anchor(
        &self,
        test_set: &str,
        filter: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for tc in self.get_test_cases(test_set)? {
            if tc.anchors_match(filter) {
                self.delete_test_case(test_set, &tc.name)?;
                deleted.push(tc.name);
            }
        }
        info!(test_set, deleted = deleted.len(), "deleted test cases by anchor");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::http::{HttpReq, HttpResp};

    fn ctx() -> ServiceContext {
        ServiceContext::in_memory(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
    }

    fn case(name: &str, user: &str) -> TestCase {
        let req = HttpReq { method: "GET".into(), url: format!("http://api/users/{user}"), ..HttpReq::default() };
        let mut tc = TestCase::from_http(name, req, HttpResp { status_code: 200, ..HttpResp::default() }, 1);
        tc.anchors.insert("user".into(), vec![user.to_string()]);
        tc
    }

    #[test]
    fn insert_get_and_list() {
        let ctx = ctx();
        let db = TestDb::new(&ctx, Path::new("keploy"));
        assert!(db.list("test-set-0").unwrap().is_empty());

        db.insert_test_case("test-set-0", &case("test-2", "bob")).unwrap();
        db.insert_test_case("test-set-0", &case("test-1", "ann")).unwrap();
        assert_eq!(db.list("test-set-0").unwrap(), ["test-1", "test-2"]);
        assert_eq!(db.get_test_case("test-set-0", "test-2").unwrap(), case("test-2", "bob"));
    }

    #[test]
    fn insert_refuses_to_overwrite() {
        let ctx = ctx();
        let db = TestDb::new(&ctx, Path::new("keploy"));
        db.insert_test_case("s", &case("test-1", "ann")).unwrap();
        assert!(db.insert_test_case("s", &case("test-1", "bob")).is_err());
    }

    #[test]
    fn update_requires_an_existing_case() {
        let ctx = ctx();
        let db = TestDb::new(&ctx, Path::new("keploy"));
        let mut tc = case("test-1", "ann");
        assert!(db.update_test_case("s", &tc).is_err());

        db.insert_test_case("s", &tc).unwrap();
        tc.noise.insert("body.id".into(), Vec::new());
        db.update_test_case("s", &tc).unwrap();
        assert!(db.get_test_case("s", "test-1").unwrap().noise.contains_key("body.id"));
    }

    #[test]
    fn delete_by_anchor_removes_only_matching_cases() {
        let ctx = ctx();
        let db = TestDb::new(&ctx, Path::new("keploy"));
        db.insert_test_case("s", &case("test-1", "ann")).unwrap();
        db.insert_test_case("s", &case("test-2", "bob")).unwrap();
        db.insert_test_case("s", &case("test-3", "ann")).unwrap();

        let filter = BTreeMap::from([("user".to_string(), vec!["ann".to_string()])]);
        assert_eq!(db.delete_by_anchor("s", &filter).unwrap(), ["test-1", "test-3"]);
        assert_eq!(db.list("s").unwrap(), ["test-2"]);
    }

    #[test]
    fn deleting_a_missing_case_fails() {
        let ctx = ctx();
        let db = TestDb::new(&ctx, Path::new("keploy"));
        assert!(db.delete_test_case("s", "test-9").is_err());
    }
}

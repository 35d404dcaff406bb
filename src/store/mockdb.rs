//! Mock persistence: one append-only stream per test set.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{next_index, store_error};
use crate::cancel::CancelToken;
use crate::context::ServiceContext;
use crate::document::stream::{parse_stream, render_document};
use crate::document::{decode_mocks, encode_mock, NetworkTrafficDoc};
use crate::error::Result;
use crate::models::Mock;
use crate::selector::{Selection, Selector};

/// Prefix of recorder-assigned mock names.
pub const MOCK_PREFIX: &str = "mock-";

/// Reads and appends mocks under `<root>/<test-set>/<mock_file>.yaml`.
pub struct MockDb<'a> {
    ctx: &'a ServiceContext,
    root: PathBuf,
    mock_file: String,
}

impl<'a> MockDb<'a> {
    /// Creates a database rooted at `root`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, root: &Path, mock_file: &str) -> Self {
        Self { ctx, root: root.to_path_buf(), mock_file: mock_file.to_string() }
    }

    fn set_dir(&self, test_set: &str) -> PathBuf {
        self.root.join(test_set)
    }

    /// Appends a mock to the test set's stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the mock cannot be encoded or the write fails.
    pub fn insert_mock(&self, test_set: &str, mock: &Mock) -> Result<()> {
        let dir = self.set_dir(test_set);
        let doc = encode_mock(mock)?;
        let data = render_document(&doc, &format!("mock {}", mock.name))?;
        self.ctx
            .store
            .write(&dir, &self.mock_file, data.as_bytes(), true)
            .map_err(|e| store_error(&dir, &self.mock_file, &e))?;
        debug!(test_set, mock = %mock.name, kind = %doc.kind, "recorded mock");
        Ok(())
    }

    fn read_docs(&self, test_set: &str) -> Result<Vec<NetworkTrafficDoc>> {
        let dir = self.set_dir(test_set);
        let bytes = match self.ctx.store.read(&dir, &self.mock_file) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                debug!(test_set, "no mocks recorded");
                return Ok(Vec::new());
            }
            Err(e) => return Err(store_error(&dir, &self.mock_file, &e)),
        };
        parse_stream(&bytes, &self.mock_file)
    }

    /// Loads every mock of a test set in recorded order. A test set without
    /// a mocks document has zero mocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is malformed or a known kind fails
    /// to decode.
    pub fn read_mocks(&self, test_set: &str) -> Result<Vec<Mock>> {
        decode_mocks(self.read_docs(test_set)?)
    }

    /// Next free `mock-N` name. Every document in the stream counts,
    /// including kinds this crate does not decode.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be read or parsed.
    pub fn next_mock_name(&self, test_set: &str) -> Result<String> {
        let docs = self.read_docs(test_set)?;
        let next = next_index(docs.iter().map(|doc| doc.name.as_str()), MOCK_PREFIX, 0);
        Ok(format!("{MOCK_PREFIX}{next}"))
    }

    /// Loads the test set's mocks and selects the ones eligible for a test
    /// that ran between `after` and `before`.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or `cancel` fired.
    pub fn filtered_mocks(
        &self,
        test_set: &str,
        selector: &Selector,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
        cancel: &CancelToken,
    ) -> Result<Selection> {
        let pool = self.read_mocks(test_set)?;
        selector.select(pool, after, before, cancel)
    }

    /// Replaces the test set's stream with `mocks`.
    ///
    /// # Errors
    ///
    /// Returns an error if a mock cannot be encoded or the write fails.
    pub fn replace_mocks(&self, test_set: &str, mocks: &[Mock]) -> Result<()> {
        let dir = self.set_dir(test_set);
        let mut data = String::new();
        for mock in mocks {
            data.push_str(&render_document(&encode_mock(mock)?, &format!("mock {}", mock.name))?);
        }
        self.ctx
            .store
            .write(&dir, &self.mock_file, data.as_bytes(), false)
            .map_err(|e| store_error(&dir, &self.mock_file, &e))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::models::generic::GenericSpec;
    use crate::models::http::HttpSpec;
    use crate::models::MockTimestamps;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn timed(name: &str, offset_secs: i64) -> Mock {
        let req = now() + Duration::seconds(offset_secs);
        let spec = GenericSpec {
            timestamps: MockTimestamps::new(req, req + Duration::milliseconds(5)),
            ..GenericSpec::default()
        };
        Mock::generic(name, spec)
    }

    #[test]
    fn missing_stream_is_zero_mocks() {
        let ctx = ServiceContext::in_memory(now());
        let db = MockDb::new(&ctx, Path::new("keploy"), "mocks");
        assert!(db.read_mocks("test-set-0").unwrap().is_empty());
    }

    #[test]
    fn inserted_mocks_read_back_in_order() {
        let ctx = ServiceContext::in_memory(now());
        let db = MockDb::new(&ctx, Path::new("keploy"), "mocks");
        db.insert_mock("test-set-0", &timed("mock-0", 0)).unwrap();
        db.insert_mock("test-set-0", &Mock::http("mock-1", HttpSpec::default())).unwrap();

        let mocks = db.read_mocks("test-set-0").unwrap();
        let names: Vec<_> = mocks.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["mock-0", "mock-1"]);
        assert_eq!(mocks[0], timed("mock-0", 0));
    }

    #[test]
    fn filtered_mocks_applies_the_window() {
        let ctx = ServiceContext::in_memory(now());
        let db = MockDb::new(&ctx, Path::new("keploy"), "mocks");
        db.replace_mocks("s", &[timed("late", 60), timed("inside", 5), timed("early", -60)]).unwrap();

        let selection = db
            .filtered_mocks(
                "s",
                &Selector::default(),
                Some(now()),
                Some(now() + Duration::seconds(10)),
                &CancelToken::never(),
            )
            .unwrap();
        assert_eq!(selection.filtered.len(), 1);
        assert_eq!(selection.filtered[0].name, "inside");
        let fallback: Vec<_> = selection.unfiltered.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(fallback, ["early", "late"]);
    }

    #[test]
    fn next_name_counts_undecoded_documents() {
        let ctx = ServiceContext::in_memory(now());
        let db = MockDb::new(&ctx, Path::new("keploy"), "mocks");
        assert_eq!(db.next_mock_name("s").unwrap(), "mock-0");

        db.insert_mock("s", &timed("mock-0", 0)).unwrap();
        let kafka = b"---\nversion: api.keploy.io/v1beta1\nkind: Kafka\nname: mock-1\nspec: {}\n";
        ctx.store.write(Path::new("keploy/s"), "mocks", kafka, true).unwrap();

        assert_eq!(db.read_mocks("s").unwrap().len(), 1);
        assert_eq!(db.next_mock_name("s").unwrap(), "mock-2");
    }

    #[test]
    fn malformed_stream_is_an_error() {
        let ctx = ServiceContext::in_memory(now());
        ctx.store.write(Path::new("keploy/s"), "mocks", b"---\nversion: [", false).unwrap();
        let db = MockDb::new(&ctx, Path::new("keploy"), "mocks");
        assert!(db.read_mocks("s").is_err());
    }
}

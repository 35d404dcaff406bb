//! Replay of a recorded test set.
//!
//! For each test case the [`Replayer`] selects the mocks recorded during
//! its window into a [`MockPool`], which answers the application's
//! outgoing calls. The application's response is then compared with the
//! recorded one and the [`TestResult`] is stored under the run id.

pub mod pool;
pub mod request;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::matcher::http::{match_response, MatchOptions};
use crate::models::http::HttpResp;
use crate::models::testrun::{MatchResult, TestReport, TestResult, TestStatus};
use crate::models::{Noise, TestCase};
use crate::report::ResultStore;
use crate::selector::Selector;
use crate::store::MockDb;

pub use pool::MockPool;
pub use request::Outgoing;

/// Drives replay for one configuration.
pub struct Replayer<'a> {
    ctx: &'a ServiceContext,
    config: &'a Config,
    results: &'a ResultStore,
}

impl<'a> Replayer<'a> {
    /// Creates a replayer writing results into `results`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, config: &'a Config, results: &'a ResultStore) -> Self {
        Self { ctx, config, results }
    }

    /// Allocates an id for a new run.
    #[must_use]
    pub fn start_run(&self) -> String {
        let run_id = self.ctx.id_gen.generate_id();
        info!(run_id = %run_id, "starting test run");
        run_id
    }

    /// Builds the mock pool for a test that ran between `after` and
    /// `before`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mocks cannot be loaded or `cancel` fired.
    pub fn mock_pool(
        &self,
        test_set: &str,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
        cancel: &CancelToken,
    ) -> Result<MockPool> {
        let selector = Selector { unfiltered_cap: self.config.selection.unfiltered_cap };
        let db = MockDb::new(self.ctx, &self.config.path, &self.config.mock_file);
        Ok(db.filtered_mocks(test_set, &selector, after, before, cancel)?.into())
    }

    /// Compares the application's response with the recorded one and
    /// stores the outcome under `run_id`.
    ///
    /// `actual` is the response, or the error that prevented getting one.
    /// Errors caused by bad recorded data are reported as setup failures.
    pub fn check(
        &self,
        run_id: &str,
        tc: &TestCase,
        actual: Result<HttpResp>,
        started: DateTime<Utc>,
    ) -> TestResult {
        let options = MatchOptions { noise: Noise::new(), arrays: self.config.matching.array_match };
        let (status, actual, result, failure_reason) = match actual {
            Err(e) => {
                let status = if e.is_setup_failure() { TestStatus::SetupFailed } else { TestStatus::Failed };
                (status, HttpResp::default(), MatchResult::default(), Some(e.to_string()))
            }
            Ok(resp) => match match_response(tc, &resp, &options) {
                Ok(outcome) if outcome.passed() => (TestStatus::Passed, resp, outcome, None),
                Ok(outcome) => (TestStatus::Failed, resp, outcome, None),
                Err(e) => (TestStatus::Failed, resp, MatchResult::default(), Some(Error::from(e).to_string())),
            },
        };
        if let Some(reason) = &failure_reason {
            warn!(run_id, test_case = %tc.name, status = ?status, reason = %reason, "test did not run to comparison");
        }
        let result = TestResult {
            kind: tc.kind.clone(),
            name: self.ctx.id_gen.generate_tagged("result"),
            status,
            started: started.timestamp(),
            completed: self.ctx.clock.unix_seconds(),
            test_case_id: tc.name.clone(),
            req: tc.http_req.clone(),
            expected: tc.http_resp.clone(),
            actual,
            noise: tc.noise.clone(),
            result,
            failure_reason,
        };
        info!(run_id, test_case = %tc.name, status = ?result.status, "test finished");
        self.results.set_result(run_id, result.clone());
        result
    }

    /// Summarises every result stored for `run_id`.
    #[must_use]
    pub fn report(&self, run_id: &str, test_set: &str) -> TestReport {
        TestReport::from_results(run_id, test_set, self.results.get_results(run_id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::codec::DecodeError;
    use crate::models::http::HttpReq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn recorded() -> TestCase {
        let resp = HttpResp { status_code: 200, body: r#"{"id":1,"at":"x"}"#.into(), ..HttpResp::default() };
        let mut tc = TestCase::from_http("test-1", HttpReq::default(), resp, 0);
        tc.noise.insert("body.at".into(), Vec::new());
        tc
    }

    #[test]
    fn statuses_follow_the_comparison() {
        let ctx = ServiceContext::in_memory(now());
        let config = Config::default();
        let results = ResultStore::new();
        let replayer = Replayer::new(&ctx, &config, &results);
        let run = replayer.start_run();

        let same = HttpResp { status_code: 200, body: r#"{"id":1,"at":"y"}"#.into(), ..HttpResp::default() };
        let different = HttpResp { status_code: 200, body: r#"{"id":2,"at":"y"}"#.into(), ..HttpResp::default() };
        assert_eq!(replayer.check(&run, &recorded(), Ok(same), now()).status, TestStatus::Passed);
        let failed = replayer.check(&run, &recorded(), Ok(different), now());
        assert_eq!(failed.status, TestStatus::Failed);
        assert!(!failed.result.body.normal);

        let report = replayer.report(&run, "test-set-0");
        assert_eq!((report.success, report.failure, report.total), (1, 1, 2));
    }

    #[test]
    fn decode_errors_are_setup_failures() {
        let ctx = ServiceContext::in_memory(now());
        let config = Config::default();
        let results = ResultStore::new();
        let replayer = Replayer::new(&ctx, &config, &results);

        let err = Error::decode("mock mock-0 request", DecodeError::short("payload", 4, 1));
        let result = replayer.check("run", &recorded(), Err(err), now());
        assert_eq!(result.status, TestStatus::SetupFailed);
        assert!(result.failure_reason.unwrap().contains("mock-0"));
        assert_eq!(replayer.check("run", &recorded(), Err(Error::Cancelled), now()).status, TestStatus::Failed);
    }

    #[test]
    fn empty_test_set_gives_an_empty_pool() {
        let ctx = ServiceContext::in_memory(now());
        let config = Config::default();
        let results = ResultStore::new();
        let pool = Replayer::new(&ctx, &config, &results)
            .mock_pool("test-set-0", Some(now()), Some(now()), &CancelToken::never())
            .unwrap();
        assert!(pool.is_empty());
    }
}

//! Replay results and per-test-set reports.

use serde::{Deserialize, Serialize};

use super::http::{HttpReq, HttpResp};
use super::{Kind, Noise, Version};

/// Outcome of replaying one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    /// Replay has started but not finished.
    Running,
    /// The live response matched the recording.
    Passed,
    /// The live response differed from the recording.
    Failed,
    /// Recorded data could not be decoded; no comparison was made.
    SetupFailed,
    /// Skipped by configuration.
    Ignored,
}

/// Comparison of a scalar part of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntResult {
    /// The values matched.
    pub normal: bool,
    /// Recorded value.
    pub expected: i64,
    /// Live value.
    pub actual: i64,
}

/// Comparison of one header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderResult {
    /// The values matched (or the header is noise).
    pub normal: bool,
    /// Header name.
    pub key: String,
    /// Recorded value, empty when absent.
    pub expected: String,
    /// Live value, empty when absent.
    pub actual: String,
}

/// How a body was compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    /// Structural JSON comparison.
    Json,
    /// Exact text comparison.
    #[default]
    Plain,
}

/// Comparison of a body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyResult {
    /// The bodies matched.
    pub normal: bool,
    /// Comparison mode.
    #[serde(rename = "type")]
    pub kind: BodyKind,
    /// Recorded body.
    pub expected: String,
    /// Live body.
    pub actual: String,
}

/// Per-part comparison of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Status code comparison.
    pub status_code: IntResult,
    /// Header comparisons in recorded order, then live-only headers.
    pub headers: Vec<HeaderResult>,
    /// Body comparison.
    pub body: BodyResult,
}

impl MatchResult {
    /// `true` when every part matched.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status_code.normal && self.body.normal && self.headers.iter().all(|h| h.normal)
    }
}

/// Result of replaying one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test case kind.
    pub kind: Kind,
    /// Result id.
    pub name: String,
    /// Outcome.
    pub status: TestStatus,
    /// Unix seconds when replay started.
    pub started: i64,
    /// Unix seconds when replay finished.
    pub completed: i64,
    /// Replayed test case.
    pub test_case_id: String,
    /// Replayed request.
    #[serde(default)]
    pub req: HttpReq,
    /// Recorded response.
    #[serde(default)]
    pub expected: HttpResp,
    /// Live response.
    #[serde(default)]
    pub actual: HttpResp,
    /// Noise applied to the comparison.
    #[serde(default)]
    pub noise: Noise,
    /// Per-part comparison.
    #[serde(default)]
    pub result: MatchResult,
    /// Setup failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Summary of one test set in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    /// Schema version.
    pub version: Version,
    /// Report name (the run id).
    pub name: String,
    /// `PASSED` or `FAILED`.
    pub status: TestStatus,
    /// Passed tests.
    pub success: usize,
    /// Failed or setup-failed tests.
    pub failure: usize,
    /// All tests.
    pub total: usize,
    /// Individual results in completion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestResult>,
    /// Test set replayed.
    pub test_set: String,
}

impl TestReport {
    /// Summarizes `tests` for a test set.
    #[must_use]
    pub fn from_results(name: impl Into<String>, test_set: impl Into<String>, tests: Vec<TestResult>) -> Self {
        let success = tests.iter().filter(|t| t.status == TestStatus::Passed).count();
        let failure = tests
            .iter()
            .filter(|t| matches!(t.status, TestStatus::Failed | TestStatus::SetupFailed))
            .count();
        let status = if failure == 0 { TestStatus::Passed } else { TestStatus::Failed };
        Self {
            version: Version::CURRENT,
            name: name.into(),
            status,
            success,
            failure,
            total: tests.len(),
            tests,
            test_set: test_set.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: TestStatus) -> TestResult {
        TestResult {
            kind: Kind::Http,
            name: "r".into(),
            status,
            started: 0,
            completed: 0,
            test_case_id: "test-1".into(),
            req: HttpReq::default(),
            expected: HttpResp::default(),
            actual: HttpResp::default(),
            noise: Noise::new(),
            result: MatchResult::default(),
            failure_reason: None,
        }
    }

    #[test]
    fn setup_failures_count_as_failures() {
        let report = TestReport::from_results(
            "run-1",
            "test-set-0",
            vec![result(TestStatus::Passed), result(TestStatus::SetupFailed)],
        );
        assert_eq!(report.success, 1);
        assert_eq!(report.failure, 1);
        assert_eq!(report.status, TestStatus::Failed);
    }

    #[test]
    fn status_persists_screaming_case() {
        let yaml = serde_yaml::to_string(&TestStatus::SetupFailed).unwrap();
        assert_eq!(yaml.trim(), "SETUP_FAILED");
    }
}

//! Replay results: a shared per-run store and a plain-text diff renderer.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::testrun::{TestResult, TestStatus};

/// Results collected concurrently by replay workers, keyed by run id.
///
/// Results of one run keep the order in which they were set.
#[derive(Debug, Default)]
pub struct ResultStore {
    runs: Mutex<HashMap<String, Vec<TestResult>>>,
}

impl ResultStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<TestResult>>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a result to a run.
    pub fn set_result(&self, run_id: &str, result: TestResult) {
        self.lock().entry(run_id.to_string()).or_default().push(result);
    }

    /// Returns a copy of a run's results; empty for unknown runs.
    #[must_use]
    pub fn get_results(&self, run_id: &str) -> Vec<TestResult> {
        self.lock().get(run_id).cloned().unwrap_or_default()
    }

    /// Removes and returns a run's results.
    pub fn take_results(&self, run_id: &str) -> Vec<TestResult> {
        self.lock().remove(run_id).unwrap_or_default()
    }
}

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Renders failed results as expected/actual diffs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    /// Emit ANSI colours.
    pub ansi: bool,
}

impl Reporter {
    fn paint(&self, colour: &str, text: &str) -> String {
        if self.ansi {
            format!("{colour}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn pair(&self, out: &mut String, label: &str, expected: &str, actual: &str) {
        let _ = writeln!(out, "  {label}");
        let _ = writeln!(out, "    - {}", self.paint(RED, expected));
        let _ = writeln!(out, "    + {}", self.paint(GREEN, actual));
    }

    /// Renders one result. Passing results give a single line.
    #[must_use]
    pub fn render(&self, result: &TestResult) -> String {
        let mut out = String::new();
        match result.status {
            TestStatus::Passed => {
                let _ = writeln!(out, "{} {}", self.paint(GREEN, "PASSED"), result.test_case_id);
                return out;
            }
            TestStatus::SetupFailed => {
                let _ = writeln!(out, "{} {}", self.paint(RED, "SETUP FAILED"), result.test_case_id);
                if let Some(reason) = &result.failure_reason {
                    let _ = writeln!(out, "  {reason}");
                }
                return out;
            }
            TestStatus::Failed => {
                let _ = writeln!(out, "{} {}", self.paint(RED, "FAILED"), result.test_case_id);
            }
            TestStatus::Running | TestStatus::Ignored => {
                let _ = writeln!(out, "{:?} {}", result.status, result.test_case_id);
                return out;
            }
        }
        let diff = &result.result;
        if !diff.status_code.normal {
            self.pair(
                &mut out,
                "status",
                &diff.status_code.expected.to_string(),
                &diff.status_code.actual.to_string(),
            );
        }
        for header in diff.headers.iter().filter(|h| !h.normal) {
            self.pair(&mut out, &format!("header {}", header.key), &header.expected, &header.actual);
        }
        if !diff.body.normal {
            self.pair(&mut out, "body", &diff.body.expected, &diff.body.actual);
        }
        out
    }

    /// Renders every result followed by a pass/fail count.
    #[must_use]
    pub fn render_all(&self, results: &[TestResult]) -> String {
        let mut out: String = results.iter().map(|r| self.render(r)).collect();
        let passed = results.iter().filter(|r| r.status == TestStatus::Passed).count();
        let _ = writeln!(out, "{passed}/{} passed", results.len());
        out
    }
}

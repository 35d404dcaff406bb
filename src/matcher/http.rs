//! Comparison of a live HTTP response against a recorded test case.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use super::{match_values, ArrayMatch, MatchError};
use crate::models::http::HttpResp;
use crate::models::testrun::{BodyKind, BodyResult, HeaderResult, IntResult, MatchResult};
use crate::models::{Noise, TestCase};

/// Settings applied on top of the test case's own noise.
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    /// Extra noise, merged with the test case's.
    pub noise: Noise,
    /// Array comparison policy for JSON bodies.
    pub arrays: ArrayMatch,
}

/// Per-part comparison of a response.
pub type MatchOutcome = MatchResult;

/// Noise split by the part of the response it applies to.
struct ResponseNoise {
    body: Noise,
    ignore_body: bool,
    headers: IndexMap<String, Vec<Regex>>,
    ignore_headers: bool,
}

impl ResponseNoise {
    fn split(noise: &Noise) -> Result<Self, MatchError> {
        let mut out = Self {
            body: Noise::new(),
            ignore_body: false,
            headers: IndexMap::new(),
            ignore_headers: false,
        };
        for (path, hints) in noise {
            match path.split_once('.') {
                None if path == "body" => out.ignore_body = hints.is_empty(),
                None if path == "header" => out.ignore_headers = true,
                Some(("body", rest)) => {
                    out.body.insert(rest.to_string(), hints.clone());
                }
                Some(("header", name)) => {
                    let compiled = hints
                        .iter()
                        .map(|p| {
                            Regex::new(p).map_err(|source| MatchError::InvalidHint {
                                path: path.clone(),
                                pattern: p.clone(),
                                source,
                            })
                        })
                        .collect::<Result<_, _>>()?;
                    out.headers.insert(name.to_ascii_lowercase(), compiled);
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn header_is_noisy(&self, name: &str, expected: Option<&str>) -> bool {
        if self.ignore_headers {
            return true;
        }
        match self.headers.get(&name.to_ascii_lowercase()) {
            Some(hints) if hints.is_empty() => true,
            Some(hints) => expected.is_some_and(|v| hints.iter().any(|re| re.is_match(v))),
            None => false,
        }
    }
}

fn find_header<'a>(headers: &'a IndexMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn compare_headers(
    expected: &IndexMap<String, String>,
    actual: &IndexMap<String, String>,
    noise: &ResponseNoise,
) -> Vec<HeaderResult> {
    let mut results: Vec<HeaderResult> = expected
        .iter()
        .map(|(name, value)| {
            let live = find_header(actual, name);
            HeaderResult {
                normal: noise.header_is_noisy(name, Some(value)) || live == Some(value.as_str()),
                key: name.clone(),
                expected: value.clone(),
                actual: live.unwrap_or_default().to_string(),
            }
        })
        .collect();
    for (name, value) in actual {
        if find_header(expected, name).is_none() {
            results.push(HeaderResult {
                normal: noise.header_is_noisy(name, None),
                key: name.clone(),
                expected: String::new(),
                actual: value.clone(),
            });
        }
    }
    results
}

fn compare_body(expected: &str, actual: &str, noise: &ResponseNoise, arrays: ArrayMatch) -> Result<BodyResult, MatchError> {
    let live_json = serde_json::from_str::<Value>(actual).ok();
    let kind = if live_json.is_some() { BodyKind::Json } else { BodyKind::Plain };
    let normal = if noise.ignore_body {
        true
    } else if let Some(live) = live_json {
        match serde_json::from_str::<Value>(expected) {
            Ok(recorded) => match match_values(recorded, live, &noise.body, arrays) {
                Ok(same) => same,
                Err(MatchError::TypeMismatch { .. }) => false,
                Err(err) => return Err(err),
            },
            Err(_) => false,
        }
    } else {
        expected == actual
    };
    Ok(BodyResult { normal, kind, expected: expected.to_string(), actual: actual.to_string() })
}

/// Compares `actual` against the response recorded in `tc`, returning
/// per-part results for diff rendering.
///
/// Noise keys are `body` (ignore the body), `body.<path>`, `header`
/// (ignore all headers) or `header.<Name>` (case-insensitive).
///
/// # Errors
///
/// Returns an error only if a noise hint is not a valid regular
/// expression; content differences are reported in the outcome.
pub fn match_response(
    tc: &TestCase,
    actual: &HttpResp,
    options: &MatchOptions,
) -> Result<MatchOutcome, MatchError> {
    let mut merged = tc.noise.clone();
    for (path, hints) in &options.noise {
        merged.entry(path.clone()).or_insert_with(|| hints.clone());
    }
    let noise = ResponseNoise::split(&merged)?;
    let expected = &tc.http_resp;
    Ok(MatchResult {
        status_code: IntResult {
            normal: expected.status_code == actual.status_code,
            expected: i64::from(expected.status_code),
            actual: i64::from(actual.status_code),
        },
        headers: compare_headers(&expected.header, &actual.header, &noise),
        body: compare_body(&expected.body, &actual.body, &noise, options.arrays)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::http::HttpReq;

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResp {
        let mut resp = HttpResp { status_code: status, body: body.into(), ..HttpResp::default() };
        for (k, v) in headers {
            resp.header.insert((*k).into(), (*v).into());
        }
        resp
    }

    fn case(resp: HttpResp, noise: &[&str]) -> TestCase {
        let mut tc = TestCase::from_http("test-1", HttpReq::default(), resp, 0);
        for path in noise {
            tc.noise.insert((*path).into(), Vec::new());
        }
        tc
    }

    #[test]
    fn identical_response_passes() {
        let resp = response(200, &[("Content-Type", "application/json")], r#"{"a":1}"#);
        let outcome = match_response(&case(resp.clone(), &[]), &resp, &MatchOptions::default()).unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.body.kind, BodyKind::Json);
    }

    #[test]
    fn noisy_header_and_body_field_are_ignored() {
        let recorded = response(200, &[("Date", "Mon"), ("Server", "x")], r#"{"id":1,"at":"a"}"#);
        let live = response(200, &[("date", "Tue"), ("Server", "x")], r#"{"id":1,"at":"b"}"#);
        let tc = case(recorded, &["header.Date", "body.at"]);
        let outcome = match_response(&tc, &live, &MatchOptions::default()).unwrap();
        assert!(outcome.passed(), "{outcome:?}");
    }

    #[test]
    fn each_part_reports_its_own_failure() {
        let recorded = response(200, &[("Server", "x")], "hello");
        let live = response(500, &[("Server", "y"), ("Extra", "1")], "bye");
        let outcome = match_response(&case(recorded, &[]), &live, &MatchOptions::default()).unwrap();
        assert!(!outcome.status_code.normal);
        assert_eq!(outcome.body.kind, BodyKind::Plain);
        assert!(!outcome.body.normal);
        assert_eq!(outcome.headers.len(), 2);
        assert!(outcome.headers.iter().all(|h| !h.normal));
    }

    #[test]
    fn whole_body_and_header_noise() {
        let recorded = response(200, &[("A", "1")], "one");
        let live = response(200, &[("B", "2")], "two");
        let outcome = match_response(&case(recorded, &["body", "header"]), &live, &MatchOptions::default()).unwrap();
        assert!(outcome.passed());
    }

    #[test]
    fn option_noise_merges_with_test_case_noise() {
        let recorded = response(200, &[], r#"{"id":1,"ts":5}"#);
        let live = response(200, &[], r#"{"id":1,"ts":6}"#);
        let tc = case(recorded, &[]);
        assert!(!match_response(&tc, &live, &MatchOptions::default()).unwrap().passed());
        let mut options = MatchOptions::default();
        options.noise.insert("body.ts".into(), Vec::new());
        assert!(match_response(&tc, &live, &options).unwrap().passed());
    }

    #[test]
    fn json_type_change_is_a_failed_body() {
        let tc = case(response(200, &[], "{}"), &[]);
        let outcome = match_response(&tc, &response(200, &[], "[]"), &MatchOptions::default()).unwrap();
        assert!(!outcome.body.normal);
    }
}

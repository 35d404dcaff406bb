//! `mocktape inspect` command.

use std::fmt::Write as _;

use super::Report;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::store::{MockDb, TestDb};

/// Lists a test set's mocks in recorded order, then its test cases.
///
/// # Errors
///
/// Returns an error if a document cannot be loaded.
pub fn run(ctx: &ServiceContext, config: &Config, test_set: &str) -> Result<Report> {
    let mocks = MockDb::new(ctx, &config.path, &config.mock_file).read_mocks(test_set)?;
    let tests = TestDb::new(ctx, &config.path).get_test_cases(test_set)?;

    let mut out = String::new();
    let _ = writeln!(out, "{test_set}: {} mocks, {} test cases", mocks.len(), tests.len());
    for mock in &mocks {
        let window = match mock.spec.timestamps().pair() {
            Some((req, res)) => format!("{} .. {}", req.to_rfc3339(), res.to_rfc3339()),
            None => "legacy".to_string(),
        };
        let config_tag = if mock.is_config() { " [config]" } else { "" };
        let _ = writeln!(out, "  {:<12} {:<9} {window}{config_tag}", mock.name, mock.kind().as_str());
    }
    for tc in &tests {
        let _ = writeln!(out, "  {:<12} {} {}", tc.name, tc.http_req.method, tc.http_req.url);
        if !tc.noise.is_empty() {
            let noise: Vec<&str> = tc.noise.keys().map(String::as_str).collect();
            let _ = writeln!(out, "    noise: {}", noise.join(", "));
        }
    }
    Ok(Report::ok(out))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::generic::GenericSpec;
    use crate::models::http::{HttpReq, HttpResp};
    use crate::models::{Mock, TestCase};

    #[test]
    fn lists_mocks_and_tests() {
        let ctx = ServiceContext::in_memory(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let config = Config::default();
        MockDb::new(&ctx, &config.path, &config.mock_file)
            .insert_mock("test-set-0", &Mock::generic("mock-0", GenericSpec::default()))
            .unwrap();
        let req = HttpReq { method: "GET".into(), url: "http://svc/a".into(), ..HttpReq::default() };
        let mut tc = TestCase::from_http("test-1", req, HttpResp::default(), 0);
        tc.noise.insert("header.Date".into(), Vec::new());
        TestDb::new(&ctx, &config.path).insert_test_case("test-set-0", &tc).unwrap();

        let out = run(&ctx, &config, "test-set-0").unwrap().output;
        assert!(out.starts_with("test-set-0: 1 mocks, 1 test cases\n"));
        assert!(out.contains("mock-0"));
        assert!(out.contains("legacy"));
        assert!(out.contains("GET http://svc/a"));
        assert!(out.contains("noise: header.Date"));
    }
}

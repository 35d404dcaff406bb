//! `mocktape sets` command.

use super::Report;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::store::Sessions;

/// Lists the test sets under the configured root.
///
/// # Errors
///
/// Returns an error if the root cannot be listed.
pub fn run(ctx: &ServiceContext, config: &Config) -> Result<Report> {
    let sessions = Sessions::new(ctx, &config.path);
    let sets = sessions.list()?;
    if sets.is_empty() {
        return Ok(Report::ok(format!("No test sets found in {}\n", config.path.display())));
    }
    let mut out = String::new();
    for set in &sets {
        out.push_str(set);
        out.push('\n');
    }
    out.push_str(&format!("next: {}\n", sessions.next_name()?));
    Ok(Report::ok(out))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn empty_root_says_so() {
        let ctx = ServiceContext::in_memory(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let report = run(&ctx, &Config::default()).unwrap();
        assert!(report.output.contains("No test sets found"));
    }

    #[test]
    fn lists_sets_and_next_name() {
        let ctx = ServiceContext::in_memory(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let config = Config::default();
        ctx.store.write(&config.path.join("test-set-0"), "mocks", b"", false).unwrap();
        let report = run(&ctx, &config).unwrap();
        assert_eq!(report.output, "test-set-0\nnext: test-set-1\n");
    }
}

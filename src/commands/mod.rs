//! Command dispatch and handlers.

pub mod compare;
pub mod inspect;
pub mod sets;

use crate::cli::Command;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::Result;

/// Text produced by a command and whether it counts as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Text for stdout.
    pub output: String,
    /// `false` turns into a failing exit status.
    pub success: bool,
}

impl Report {
    /// A successful report.
    #[must_use]
    pub fn ok(output: String) -> Self {
        Self { output, success: true }
    }
}

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error if the selected command handler fails.
pub fn dispatch(command: &Command, ctx: &ServiceContext, config: &Config) -> Result<Report> {
    match command {
        Command::Sets => sets::run(ctx, config),
        Command::Inspect { test_set } => inspect::run(ctx, config, test_set),
        Command::Compare { expected, actual, noise, strict_arrays } => {
            let arrays = if *strict_arrays { crate::matcher::ArrayMatch::Strict } else { config.matching.array_match };
            compare::run(expected, actual, noise, arrays)
        }
    }
}

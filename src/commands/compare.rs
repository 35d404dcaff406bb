//! `mocktape compare` command.

use std::path::Path;

use super::Report;
use crate::error::{Error, Result};
use crate::matcher::{match_json_with, ArrayMatch};
use crate::models::Noise;

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), e))
}

/// Compares two JSON files, ignoring every path in `noise`.
///
/// # Errors
///
/// Returns an error if a file cannot be read, is not JSON, or the
/// documents have different top-level types.
pub fn run(expected: &Path, actual: &Path, noise: &[String], arrays: ArrayMatch) -> Result<Report> {
    let noise: Noise = noise.iter().map(|p| (p.clone(), Vec::new())).collect();
    let same = match_json_with(&read(expected)?, &read(actual)?, &noise, arrays)?;
    let verdict = if same { "PASSED" } else { "FAILED" };
    Ok(Report { output: format!("{verdict}: {} vs {}\n", expected.display(), actual.display()), success: same })
}

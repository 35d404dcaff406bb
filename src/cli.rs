//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `mocktape`.
#[derive(Debug, Parser)]
#[command(name = "mocktape", version, about = "Inspect recorded mocks and compare responses")]
pub struct Cli {
    /// Configuration file (YAML). `MOCKTAPE_*` variables override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory holding the test sets.
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the recorded test sets.
    Sets,
    /// List the mocks and test cases of a test set.
    Inspect {
        /// Test set name, e.g. `test-set-0`.
        test_set: String,
    },
    /// Compare two JSON documents, ignoring noisy fields.
    Compare {
        /// Expected document.
        expected: PathBuf,
        /// Actual document.
        actual: PathBuf,
        /// Dotted path to ignore; repeatable.
        #[arg(long = "noise", value_name = "PATH")]
        noise: Vec<String>,
        /// Compare arrays position by position.
        #[arg(long)]
        strict_arrays: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_inspect_subcommand() {
        let cli = Cli::parse_from(["mocktape", "inspect", "test-set-0", "--path", "recordings"]);
        assert!(matches!(&cli.command, Command::Inspect { test_set } if test_set == "test-set-0"));
        assert_eq!(cli.path.unwrap().to_str(), Some("recordings"));
    }

    #[test]
    fn parses_repeated_noise_paths() {
        let cli = Cli::parse_from(["mocktape", "compare", "a.json", "b.json", "--noise", "id", "--noise", "meta.ts"]);
        let Command::Compare { noise, strict_arrays, .. } = cli.command else { panic!("not compare") };
        assert_eq!(noise, ["id", "meta.ts"]);
        assert!(!strict_arrays);
    }

    #[test]
    fn compare_requires_two_documents() {
        assert!(Cli::try_parse_from(["mocktape", "compare", "a.json"]).is_err());
    }
}

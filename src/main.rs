//! Binary entrypoint for the `mocktape` CLI.

use std::process::ExitCode;

use clap::Parser;
use mocktape::cli::Cli;

fn main() -> ExitCode {
    match mocktape::run(&Cli::parse()) {
        Ok(report) => {
            print!("{}", report.output);
            if report.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

//! Core library for `mocktape`: a record/replay engine for integration
//! tests.
//!
//! Intercepted traffic between an application and its dependencies is
//! decoded by [`codec`] into the typed [`models`], persisted as kind-tagged
//! mocks and test cases through [`store`], and replayed by [`replay`],
//! which selects mocks with [`selector`] and compares responses with
//! [`matcher`].

pub mod adapters;
pub mod cancel;
pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod models;
pub mod noise;
pub mod ports;
pub mod queue;
pub mod record;
pub mod replay;
pub mod report;
pub mod selector;
pub mod store;

pub use error::{Error, Result};

use commands::Report;
use config::Config;
use context::ServiceContext;

/// Run a parsed CLI invocation against the live context.
///
/// Loads configuration, applies command-line overrides and installs the
/// log subscriber before dispatching.
///
/// # Errors
///
/// Returns an error when configuration is invalid or the command fails.
pub fn run(cli: &cli::Cli) -> Result<Report> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = &cli.path {
        config.path.clone_from(path);
    }
    logging::init(&config.log)?;
    commands::dispatch(&cli.command, &ServiceContext::live(), &config)
}

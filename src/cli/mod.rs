//! Command-line interface
//!
//! - run: execute one aggregate request over a JSON data directory
//! - explain: print the command an aggregate request would send

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    execute_request, explain, explain_request, run, run_aggregate, run_command, AggregateRequest,
};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, read_request_from, write_error, write_json, write_response};

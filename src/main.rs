//! docagg CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. Errors have already
//! been written to stdout as a JSON error response; they are repeated on
//! stderr and the process exits non-zero.

use docagg::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

//! Observability for docagg
//!
//! Structured JSON logging, filtered by a process-wide minimum severity.
//!
//! ```ignore
//! use docagg::observability::{Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Info);
//! Logger::info("AGGREGATE_EXECUTED", &[("collection", "bands")]);
//! ```

mod logger;

pub use logger::{Logger, Severity};

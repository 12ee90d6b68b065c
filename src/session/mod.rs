//! Database session interface
//!
//! The aggregate layer talks to the database only through these traits:
//!
//! - [`Collection`]: names the target and hands out its session
//! - [`Session`]: runs one command under a read consistency
//!
//! [`MemorySession`] is a local implementation that evaluates commands over
//! in-memory documents.

mod errors;
mod evaluator;
mod filters;
mod memory;
mod sorter;

use serde_json::{Map, Value};

use crate::pipeline::AggregateCommand;

pub use errors::{DatabaseError, DatabaseResult};
pub use evaluator::PipelineEvaluator;
pub use filters::SelectorFilter;
pub use memory::{MemoryCollection, MemorySession};
pub use sorter::ValueSorter;

/// Raw command reply. On success, `"result"` holds the document array.
pub type CommandResponse = Map<String, Value>;

/// Key of the document array in a command reply
pub const RESULT_KEY: &str = "result";

/// Read consistency requested for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consistency {
    /// Primary reads; observes every acknowledged write
    Strong,
    /// Secondary reads allowed; may lag
    Eventual,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Strong => "strong",
            Consistency::Eventual => "eventual",
        }
    }
}

/// Runs commands against the database.
///
/// Calls block until the database replies. Timeouts and cancellation are the
/// implementation's concern.
pub trait Session {
    fn command(
        &self,
        command: &AggregateCommand,
        consistency: Consistency,
    ) -> DatabaseResult<CommandResponse>;
}

/// A named collection bound to a session
pub trait Collection {
    fn name(&self) -> &str;

    fn session(&self) -> &dyn Session;
}

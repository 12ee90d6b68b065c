//! Aggregate command construction
//!
//! Turns a grouping expression, an optional unwind field and query criteria
//! into a single aggregate command.
//!
//! # Stage layout
//!
//! The command carries exactly one stage. Its entries appear in this order:
//!
//! 1. `$group` (always)
//! 2. `$unwind`
//! 3. `$match`
//! 4. `$sort`
//! 5. `$limit`
//! 6. `$skip`
//! 7. `$project`
//!
//! Entries 2-7 are present only when their source is set and non-empty.

mod command;
mod errors;
mod explain;
mod stage;

pub use command::{AggregateCommand, CommandBuilder};
pub use errors::{PipelineError, PipelineErrorCode, PipelineResult};
pub use explain::AggregateExplain;
pub use stage::{field_path, PipelineStage, StageBuilder, StageTag, FIELD_PATH_PREFIX};

//! Query criteria: selector plus sort/limit/skip/fields options
//!
//! Criteria are produced elsewhere and handed to the command builder as
//! read-only input.

mod criteria;
mod options;

pub use criteria::{Criteria, Selector};
pub use options::{FieldSpec, QueryOptions, SortDirection, SortSpec};

//! docagg - grouping aggregations over document collections
//!
//! Turns query criteria plus a grouping expression into a single aggregate
//! command, runs it once through a database session and exposes the cached
//! result documents.
//!
//! ```text
//! Criteria ──► CommandBuilder ──► Aggregate ──► Session::command (once)
//!                                     │
//!                                     └──► Documents (cached "result")
//! ```

pub mod aggregate;
pub mod cli;
pub mod criteria;
pub mod observability;
pub mod pipeline;
pub mod session;

pub use aggregate::{Aggregate, Documents};
pub use criteria::{Criteria, FieldSpec, QueryOptions, SortDirection, SortSpec};
pub use pipeline::{AggregateCommand, CommandBuilder, PipelineError, PipelineResult};
pub use session::{
    Collection, CommandResponse, Consistency, DatabaseError, DatabaseResult, MemoryCollection,
    MemorySession, Session,
};

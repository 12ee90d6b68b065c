//! Aggregate execution and result access
//!
//! [`Aggregate`] owns the built command and a one-shot reply cache.
//! [`Documents`] is a borrowed view over the cached result array.

mod aggregate;
mod documents;

pub use aggregate::Aggregate;
pub use documents::Documents;

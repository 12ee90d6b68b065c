//! Query criteria consumed by the command builder
//!
//! Criteria are read-only input: the builder never mutates them.

use serde_json::{Map, Value};

use super::options::{FieldSpec, QueryOptions, SortDirection, SortSpec};

/// Filter predicate document, e.g. `{"genre": "rock"}`
pub type Selector = Map<String, Value>;

/// Selector and options for a query against one document type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    /// Target document type name (display only)
    klass: String,
    selector: Selector,
    options: QueryOptions,
}

impl Criteria {
    /// Creates empty criteria for the given document type
    pub fn new(klass: impl Into<String>) -> Self {
        Self {
            klass: klass.into(),
            selector: Selector::new(),
            options: QueryOptions::new(),
        }
    }

    /// Replaces the selector
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    /// Adds an equality condition to the selector
    pub fn where_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.selector.insert(field.into(), value);
        self
    }

    /// Appends a sort key
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        let sort = self.options.sort.take().unwrap_or_default();
        self.options.sort = Some(sort.by(field, direction));
        self
    }

    /// Replaces the sort spec
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.options.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.options.skip = Some(skip);
        self
    }

    /// Restricts returned fields to the given list
    pub fn only<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.options.fields = Some(FieldSpec::only(fields));
        self
    }

    /// Drops the given fields from returned documents
    pub fn without<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.options.fields = Some(FieldSpec::without(fields));
        self
    }

    pub fn klass(&self) -> &str {
        &self.klass
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }
}

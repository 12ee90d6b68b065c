//! Human-readable description of an aggregate
//!
//! Summarizes selector, options, target type, grouping expression and unwind
//! field. Output is deterministic for identical inputs.

use std::fmt;

use crate::criteria::Criteria;

use super::command::AggregateCommand;

/// Explain output for an aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateExplain {
    /// Target collection
    pub collection: String,
    /// Target document type
    pub klass: String,
    /// Selector as compact JSON
    pub selector: String,
    /// Criteria options as compact JSON
    pub options: String,
    /// Grouping expression as compact JSON
    pub group: String,
    /// Unwind field path, if any
    pub unwind: Option<String>,
    /// Wire keys present on the stage, in order
    pub stages: Vec<String>,
}

impl AggregateExplain {
    pub fn new(command: &AggregateCommand, criteria: &Criteria) -> Self {
        let stage = command.stage();
        Self {
            collection: command.collection().to_string(),
            klass: criteria.klass().to_string(),
            selector: serde_json::Value::Object(criteria.selector().clone()).to_string(),
            options: criteria.options().to_value().to_string(),
            group: stage.group().to_string(),
            unwind: stage.unwind().map(str::to_string),
            stages: stage.tags().iter().map(|t| t.key().to_string()).collect(),
        }
    }
}

impl fmt::Display for AggregateExplain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== AGGREGATE ===")?;
        writeln!(f, "Collection: {}", self.collection)?;
        writeln!(f, "Class: {}", self.klass)?;
        writeln!(f, "Selector: {}", self.selector)?;
        writeln!(f, "Options: {}", self.options)?;
        writeln!(f, "Group: {}", self.group)?;
        match &self.unwind {
            Some(unwind) => writeln!(f, "Unwind: {}", unwind)?,
            None => writeln!(f, "Unwind: none")?,
        }
        writeln!(f, "Stages: {}", self.stages.join(", "))?;
        Ok(())
    }
}

//! Aggregate command assembly
//!
//! Build order (fixed):
//! 1. Target collection
//! 2. `$group` from the grouping expression
//! 3. `$unwind` if an unwind field is given
//! 4. `$match` if the selector is non-empty
//! 5. `$sort`, `$limit`, `$skip`, `$project` from the criteria options
//!
//! Building is pure: same inputs, same command, no I/O.

use serde::Serialize;
use serde_json::Value;

use crate::criteria::Criteria;

use super::errors::{PipelineError, PipelineResult};
use super::stage::{PipelineStage, StageBuilder};

/// `{aggregate: <collection>, pipeline: [<stage>]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateCommand {
    aggregate: String,
    pipeline: Vec<PipelineStage>,
}

impl AggregateCommand {
    /// Target collection name
    pub fn collection(&self) -> &str {
        &self.aggregate
    }

    pub fn pipeline(&self) -> &[PipelineStage] {
        &self.pipeline
    }

    /// The leading stage, which carries every entry
    pub fn stage(&self) -> &PipelineStage {
        &self.pipeline[0]
    }

    /// The command as a JSON value, keys in serialized order
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Builds an [`AggregateCommand`] from a grouping expression and criteria
#[derive(Debug, Clone)]
pub struct CommandBuilder<'a> {
    collection: &'a str,
    group: Value,
    unwind: Option<&'a str>,
    criteria: Option<&'a Criteria>,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(collection: &'a str, group: Value) -> Self {
        Self {
            collection,
            group,
            unwind: None,
            criteria: None,
        }
    }

    /// Sets the field to unwind. `None` or an empty name means no unwind.
    pub fn unwind(mut self, field: Option<&'a str>) -> Self {
        self.unwind = field.filter(|f| !f.is_empty());
        self
    }

    pub fn criteria(mut self, criteria: &'a Criteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Assembles the command.
    ///
    /// Only a single group/unwind stage is supported.
    pub fn build(self) -> PipelineResult<AggregateCommand> {
        if self.collection.is_empty() {
            return Err(PipelineError::invalid_target(
                "Aggregate target collection name must not be empty",
            ));
        }

        let mut stage = StageBuilder::group(self.group);
        if let Some(field) = self.unwind {
            stage = stage.unwind(field);
        }
        if let Some(criteria) = self.criteria {
            stage = apply_criteria_options(stage, criteria);
        }

        Ok(AggregateCommand {
            aggregate: self.collection.to_string(),
            pipeline: vec![stage.build()?],
        })
    }
}

/// Adds match/sort/limit/skip/project entries for whatever the criteria set.
fn apply_criteria_options(mut stage: StageBuilder, criteria: &Criteria) -> StageBuilder {
    if !criteria.selector().is_empty() {
        stage = stage.matching(criteria.selector().clone());
    }

    let options = criteria.options();
    if let Some(sort) = options.sort.as_ref().filter(|s| !s.is_empty()) {
        stage = stage.sort(sort.clone());
    }
    if let Some(limit) = options.limit {
        stage = stage.limit(limit);
    }
    if let Some(skip) = options.skip {
        stage = stage.skip(skip);
    }
    if let Some(fields) = options.fields.as_ref().filter(|f| !f.is_empty()) {
        stage = stage.project(fields.clone());
    }
    stage
}

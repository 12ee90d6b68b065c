//! The single leading pipeline stage
//!
//! A stage is a record of optional entries, one per [`StageTag`]. Entries are
//! always emitted in `StageTag::ORDER`, regardless of the order the builder
//! received them in.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::criteria::{FieldSpec, Selector, SortSpec};
use crate::observability::Logger;

use super::errors::{PipelineError, PipelineResult};

/// Prefix marking a value as a field path
pub const FIELD_PATH_PREFIX: char = '$';

/// Entry tags of a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageTag {
    Group,
    Unwind,
    Match,
    Sort,
    Limit,
    Skip,
    Project,
}

impl StageTag {
    /// Emission order of entries within a stage
    pub const ORDER: [StageTag; 7] = [
        StageTag::Group,
        StageTag::Unwind,
        StageTag::Match,
        StageTag::Sort,
        StageTag::Limit,
        StageTag::Skip,
        StageTag::Project,
    ];

    /// Wire key for this tag
    pub fn key(&self) -> &'static str {
        match self {
            StageTag::Group => "$group",
            StageTag::Unwind => "$unwind",
            StageTag::Match => "$match",
            StageTag::Sort => "$sort",
            StageTag::Limit => "$limit",
            StageTag::Skip => "$skip",
            StageTag::Project => "$project",
        }
    }

    /// Parses a wire key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ORDER.iter().copied().find(|tag| tag.key() == key)
    }
}

/// Returns `field` as a field path (`name` -> `$name`).
/// Already-prefixed fields are returned unchanged.
pub fn field_path(field: &str) -> String {
    if field.starts_with(FIELD_PATH_PREFIX) {
        field.to_string()
    } else {
        format!("{}{}", FIELD_PATH_PREFIX, field)
    }
}

/// Immutable pipeline stage produced by [`StageBuilder`]
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStage {
    group: Value,
    unwind: Option<String>,
    selector: Option<Selector>,
    sort: Option<SortSpec>,
    limit: Option<u64>,
    skip: Option<u64>,
    projection: Option<FieldSpec>,
}

impl PipelineStage {
    /// Grouping expression (always present)
    pub fn group(&self) -> &Value {
        &self.group
    }

    /// Unwind field path, already prefixed
    pub fn unwind(&self) -> Option<&str> {
        self.unwind.as_deref()
    }

    pub fn selector(&self) -> Option<&Selector> {
        self.selector.as_ref()
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn projection(&self) -> Option<&FieldSpec> {
        self.projection.as_ref()
    }

    /// Whether the stage carries an entry for `tag`
    pub fn contains(&self, tag: StageTag) -> bool {
        match tag {
            StageTag::Group => true,
            StageTag::Unwind => self.unwind.is_some(),
            StageTag::Match => self.selector.is_some(),
            StageTag::Sort => self.sort.is_some(),
            StageTag::Limit => self.limit.is_some(),
            StageTag::Skip => self.skip.is_some(),
            StageTag::Project => self.projection.is_some(),
        }
    }

    /// Present tags in emission order
    pub fn tags(&self) -> Vec<StageTag> {
        StageTag::ORDER
            .iter()
            .copied()
            .filter(|tag| self.contains(*tag))
            .collect()
    }

    /// Entry payload for `tag` as a JSON value
    pub fn get(&self, tag: StageTag) -> Option<Value> {
        match tag {
            StageTag::Group => Some(self.group.clone()),
            StageTag::Unwind => self.unwind.clone().map(Value::String),
            StageTag::Match => self.selector.clone().map(Value::Object),
            StageTag::Sort => self.sort.as_ref().and_then(|s| serde_json::to_value(s).ok()),
            StageTag::Limit => self.limit.map(Value::from),
            StageTag::Skip => self.skip.map(Value::from),
            StageTag::Project => self
                .projection
                .as_ref()
                .and_then(|p| serde_json::to_value(p).ok()),
        }
    }

    /// `(wire key, payload)` pairs in emission order
    pub fn entries(&self) -> Vec<(&'static str, Value)> {
        self.tags()
            .into_iter()
            .filter_map(|tag| self.get(tag).map(|value| (tag.key(), value)))
            .collect()
    }
}

impl Serialize for PipelineStage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tags().len()))?;
        map.serialize_entry(StageTag::Group.key(), &self.group)?;
        if let Some(unwind) = &self.unwind {
            map.serialize_entry(StageTag::Unwind.key(), unwind)?;
        }
        if let Some(selector) = &self.selector {
            map.serialize_entry(StageTag::Match.key(), selector)?;
        }
        if let Some(sort) = &self.sort {
            map.serialize_entry(StageTag::Sort.key(), sort)?;
        }
        if let Some(limit) = self.limit {
            map.serialize_entry(StageTag::Limit.key(), &limit)?;
        }
        if let Some(skip) = self.skip {
            map.serialize_entry(StageTag::Skip.key(), &skip)?;
        }
        if let Some(projection) = &self.projection {
            map.serialize_entry(StageTag::Project.key(), projection)?;
        }
        map.end()
    }
}

/// Accumulates stage entries, then freezes them into a [`PipelineStage`]
#[derive(Debug, Clone)]
pub struct StageBuilder {
    stage: PipelineStage,
}

impl StageBuilder {
    /// Starts a stage from its grouping expression
    pub fn group(expression: Value) -> Self {
        Self {
            stage: PipelineStage {
                group: expression,
                unwind: None,
                selector: None,
                sort: None,
                limit: None,
                skip: None,
                projection: None,
            },
        }
    }

    /// Sets the unwind entry to the field path of `field`
    pub fn unwind(mut self, field: &str) -> Self {
        self.stage.unwind = Some(field_path(field));
        self
    }

    pub fn matching(mut self, selector: Selector) -> Self {
        self.stage.selector = Some(selector);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.stage.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.stage.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.stage.skip = Some(skip);
        self
    }

    pub fn project(mut self, fields: FieldSpec) -> Self {
        self.stage.projection = Some(fields);
        self
    }

    /// Finalizes the stage.
    ///
    /// Fails if the grouping expression has a top-level key equal to the wire
    /// key of a sibling entry this stage carries.
    pub fn build(self) -> PipelineResult<PipelineStage> {
        if let Value::Object(group) = &self.stage.group {
            for key in group.keys() {
                let conflict = StageTag::from_key(key)
                    .filter(|tag| *tag != StageTag::Group && self.stage.contains(*tag));
                if conflict.is_some() {
                    Logger::warn("PIPELINE_STAGE_CONFLICT", &[("key", key.as_str())]);
                    return Err(PipelineError::conflicting_stage_key(key.as_str()));
                }
            }
        }
        Ok(self.stage)
    }
}

//! Query options carried by criteria
//!
//! Sort and field specs keep their entries in the order they were declared,
//! since the database reads multi-key sorts left to right.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Wire value: 1 for ascending, -1 for descending
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }

    /// Parses a wire value. Any negative number is descending.
    pub fn from_i64(value: i64) -> Self {
        if value < 0 {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Ordered sort specification: `{field: 1 | -1, ...}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    fields: Vec<(String, SortDirection)>,
}

impl SortSpec {
    /// Creates an empty sort spec
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sort spec from `(field, direction)` pairs
    pub fn from_pairs<I, F>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (F, SortDirection)>,
        F: Into<String>,
    {
        let mut spec = Self::new();
        for (field, direction) in pairs {
            spec = spec.by(field, direction);
        }
        spec
    }

    /// Appends a sort key. A field sorted twice keeps its first position and
    /// takes the latest direction.
    pub fn by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        let field = field.into();
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = direction,
            None => self.fields.push((field, direction)),
        }
        self
    }

    pub fn asc(self, field: impl Into<String>) -> Self {
        self.by(field, SortDirection::Asc)
    }

    pub fn desc(self, field: impl Into<String>) -> Self {
        self.by(field, SortDirection::Desc)
    }

    /// Returns the sort keys in declaration order
    pub fn fields(&self) -> &[(String, SortDirection)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, direction) in &self.fields {
            map.serialize_entry(field, &direction.as_i32())?;
        }
        map.end()
    }
}

/// Ordered field inclusion spec: `{field: 1 | 0, ...}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSpec {
    fields: Vec<(String, bool)>,
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inclusion spec for the given fields
    pub fn only<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        fields.into_iter().fold(Self::new(), |spec, f| spec.include(f))
    }

    /// Exclusion spec for the given fields
    pub fn without<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        fields.into_iter().fold(Self::new(), |spec, f| spec.exclude(f))
    }

    pub fn include(self, field: impl Into<String>) -> Self {
        self.set(field.into(), true)
    }

    pub fn exclude(self, field: impl Into<String>) -> Self {
        self.set(field.into(), false)
    }

    fn set(mut self, field: String, included: bool) -> Self {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = included,
            None => self.fields.push((field, included)),
        }
        self
    }

    /// Returns `(field, included)` pairs in declaration order
    pub fn fields(&self) -> &[(String, bool)] {
        &self.fields
    }

    /// Returns the inclusion flag for a field, if it is mentioned
    pub fn get(&self, field: &str) -> Option<bool> {
        self.fields
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, included)| *included)
    }

    /// True if any field other than `_id` is included
    pub fn is_inclusion(&self) -> bool {
        self.fields.iter().any(|(f, included)| *included && f != "_id")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for FieldSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, included) in &self.fields {
            map.serialize_entry(field, &i32::from(*included))?;
        }
        map.end()
    }
}

/// Sparse option bag recognised by the command builder
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldSpec>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no option is set
    pub fn is_empty(&self) -> bool {
        self.sort.is_none() && self.limit.is_none() && self.skip.is_none() && self.fields.is_none()
    }

    /// Options rendered as a JSON value (absent keys omitted)
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_spec_keeps_declaration_order() {
        let sort = SortSpec::new().desc("name").asc("likes");
        let rendered = serde_json::to_string(&sort).unwrap();
        assert_eq!(rendered, r#"{"name":-1,"likes":1}"#);
    }

    #[test]
    fn test_sort_spec_resorting_field_replaces_direction() {
        let sort = SortSpec::new().asc("name").asc("likes").desc("name");
        assert_eq!(
            sort.fields(),
            &[
                ("name".to_string(), SortDirection::Desc),
                ("likes".to_string(), SortDirection::Asc)
            ]
        );
    }

    #[test]
    fn test_sort_direction_wire_values() {
        assert_eq!(SortDirection::Asc.as_i32(), 1);
        assert_eq!(SortDirection::Desc.as_i32(), -1);
        assert_eq!(SortDirection::from_i64(-5), SortDirection::Desc);
        assert_eq!(SortDirection::from_i64(0), SortDirection::Asc);
    }

    #[test]
    fn test_field_spec_only() {
        let fields = FieldSpec::only(["name"]);
        assert_eq!(serde_json::to_value(&fields).unwrap(), json!({"name": 1}));
        assert!(fields.is_inclusion());
        assert_eq!(fields.get("name"), Some(true));
        assert_eq!(fields.get("genre"), None);
    }

    #[test]
    fn test_field_spec_without() {
        let fields = FieldSpec::without(["likes", "_id"]);
        assert_eq!(
            serde_json::to_string(&fields).unwrap(),
            r#"{"likes":0,"_id":0}"#
        );
        assert!(!fields.is_inclusion());
    }

    #[test]
    fn test_query_options_value_omits_absent_keys() {
        let options = QueryOptions {
            limit: Some(10),
            ..QueryOptions::default()
        };
        assert_eq!(options.to_value(), json!({"limit": 10}));
        assert!(QueryOptions::new().is_empty());
        assert!(!options.is_empty());
    }
}

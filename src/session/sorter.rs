//! Value ordering for `$sort`, `$min` and `$max`
//!
//! Type order: missing < null < bool < number < string < array < object.
//! Sorting is stable.

use std::cmp::Ordering;

use serde_json::Value;

use crate::criteria::{SortDirection, SortSpec};

use super::filters::resolve_path;

/// Sorts and compares JSON values
pub struct ValueSorter;

impl ValueSorter {
    /// Sorts documents by every sort key, left to right
    pub fn sort(documents: &mut [Value], spec: &SortSpec) {
        documents.sort_by(|a, b| {
            for (field, direction) in spec.fields() {
                let ordering = Self::compare(resolve_path(a, field), resolve_path(b, field));
                let ordering = match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Total order over optional JSON values
    pub fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let a_type = Self::type_order(a_val);
                let b_type = Self::type_order(b_val);
                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }

                match (a_val, b_val) {
                    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                    (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
                        (Some(xi), Some(yi)) => xi.cmp(&yi),
                        _ => {
                            let xf = x.as_f64().unwrap_or(0.0);
                            let yf = y.as_f64().unwrap_or(0.0);
                            xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
                        }
                    },
                    (Value::String(x), Value::String(y)) => x.cmp(y),
                    (Value::Array(x), Value::Array(y)) => {
                        for (xe, ye) in x.iter().zip(y.iter()) {
                            let ordering = Self::compare(Some(xe), Some(ye));
                            if ordering != Ordering::Equal {
                                return ordering;
                            }
                        }
                        x.len().cmp(&y.len())
                    }
                    // Nulls compare equal; objects are not ordered
                    _ => Ordering::Equal,
                }
            }
        }
    }

    fn type_order(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
}

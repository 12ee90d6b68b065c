//! Selector evaluation for `$match`
//!
//! Supported:
//! - field equality (array fields match when any element is equal)
//! - `$eq $ne $gt $gte $lt $lte $in $nin $exists`
//! - `$and $or $nor`
//!
//! Range operators compare numbers with numbers and strings with strings
//! only. No coercion across types.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::errors::{DatabaseError, DatabaseResult};
use super::sorter::ValueSorter;

/// Server code for malformed query operators
const BAD_VALUE: i32 = 2;

/// Resolves a dotted field path (`a.b.0.c`) inside a document
pub fn resolve_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Evaluates selectors against documents
pub struct SelectorFilter;

impl SelectorFilter {
    /// Checks if a document matches every condition of the selector
    pub fn matches(document: &Value, selector: &Map<String, Value>) -> DatabaseResult<bool> {
        for (key, condition) in selector {
            let matched = match key.as_str() {
                "$and" => Self::all_of(document, condition)?,
                "$or" => Self::any_of(document, condition)?,
                "$nor" => !Self::any_of(document, condition)?,
                op if op.starts_with('$') => {
                    return Err(DatabaseError::command_failed(
                        BAD_VALUE,
                        format!("unknown top level operator: {}", op),
                    ))
                }
                field => Self::matches_field(resolve_path(document, field), condition)?,
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn clauses(condition: &Value) -> DatabaseResult<Vec<&Map<String, Value>>> {
        let items = condition.as_array().filter(|a| !a.is_empty()).ok_or_else(|| {
            DatabaseError::command_failed(BAD_VALUE, "$and/$or/$nor must be a nonempty array")
        })?;
        items
            .iter()
            .map(|item| {
                item.as_object().ok_or_else(|| {
                    DatabaseError::command_failed(
                        BAD_VALUE,
                        "$or/$and/$nor entries need to be full objects",
                    )
                })
            })
            .collect()
    }

    fn all_of(document: &Value, condition: &Value) -> DatabaseResult<bool> {
        for clause in Self::clauses(condition)? {
            if !Self::matches(document, clause)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn any_of(document: &Value, condition: &Value) -> DatabaseResult<bool> {
        for clause in Self::clauses(condition)? {
            if Self::matches(document, clause)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn matches_field(actual: Option<&Value>, condition: &Value) -> DatabaseResult<bool> {
        match condition {
            Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
                for (op, operand) in ops {
                    if !Self::apply_operator(actual, op, operand)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            expected => Ok(Self::eq_match(actual, expected)),
        }
    }

    fn apply_operator(actual: Option<&Value>, op: &str, operand: &Value) -> DatabaseResult<bool> {
        let matched = match op {
            "$eq" => Self::eq_match(actual, operand),
            "$ne" => !Self::eq_match(actual, operand),
            "$gt" => Self::range_match(actual, operand, |o| o == Ordering::Greater),
            "$gte" => Self::range_match(actual, operand, |o| o != Ordering::Less),
            "$lt" => Self::range_match(actual, operand, |o| o == Ordering::Less),
            "$lte" => Self::range_match(actual, operand, |o| o != Ordering::Greater),
            "$in" => Self::in_list(actual, operand, op)?,
            "$nin" => !Self::in_list(actual, operand, op)?,
            "$exists" => {
                let wanted = match operand {
                    Value::Bool(b) => *b,
                    Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
                    Value::Null => false,
                    _ => true,
                };
                actual.is_some() == wanted
            }
            other => {
                return Err(DatabaseError::command_failed(
                    BAD_VALUE,
                    format!("unknown operator: {}", other),
                ))
            }
        };
        Ok(matched)
    }

    /// Exact equality; a missing field equals null; arrays match by element
    fn eq_match(actual: Option<&Value>, expected: &Value) -> bool {
        match actual {
            None => expected.is_null(),
            Some(value) if value == expected => true,
            Some(Value::Array(items)) => items.iter().any(|item| item == expected),
            Some(_) => false,
        }
    }

    fn range_match<F>(actual: Option<&Value>, bound: &Value, accept: F) -> bool
    where
        F: Fn(Ordering) -> bool,
    {
        let compare = |value: &Value| match (value, bound) {
            (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_)) => {
                accept(ValueSorter::compare(Some(value), Some(bound)))
            }
            _ => false,
        };

        match actual {
            None => false,
            Some(Value::Array(items)) => items.iter().any(compare),
            Some(value) => compare(value),
        }
    }

    fn in_list(actual: Option<&Value>, operand: &Value, op: &str) -> DatabaseResult<bool> {
        let candidates = operand.as_array().ok_or_else(|| {
            DatabaseError::command_failed(BAD_VALUE, format!("{} needs an array", op))
        })?;
        Ok(candidates.iter().any(|c| Self::eq_match(actual, c)))
    }
}

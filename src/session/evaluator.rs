//! Local evaluation of an aggregate stage
//!
//! The criteria entries describe the source documents, so they run first and
//! the grouping runs last:
//!
//! 1. `$unwind`
//! 2. `$match`
//! 3. `$sort`
//! 4. `$skip`
//! 5. `$limit`
//! 6. `$project`
//! 7. `$group`
//!
//! Error codes mirror the ones a document server reports for the same
//! malformed input.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use crate::criteria::FieldSpec;
use crate::pipeline::{PipelineStage, FIELD_PATH_PREFIX};

use super::errors::{DatabaseError, DatabaseResult};
use super::filters::{resolve_path, SelectorFilter};
use super::sorter::ValueSorter;

const GROUP_NOT_OBJECT: i32 = 15947;
const UNKNOWN_GROUP_OPERATOR: i32 = 15952;
const GROUP_MISSING_ID: i32 = 15955;
const LIMIT_NOT_POSITIVE: i32 = 15958;
const UNRECOGNIZED_EXPRESSION: i32 = 168;
const ACCUMULATOR_NOT_OBJECT: i32 = 40234;
const PROJECTION_MIXED: i32 = 31254;

/// Floats below this magnitude convert to `i64` exactly
const INTEGRAL_FLOAT_LIMIT: f64 = 9.007_199_254_740_992e15;

/// Applies pipeline stages to in-memory documents
pub struct PipelineEvaluator;

impl PipelineEvaluator {
    /// Runs every entry of `stage` over `documents`
    pub fn run(stage: &PipelineStage, documents: Vec<Value>) -> DatabaseResult<Vec<Value>> {
        if stage.limit() == Some(0) {
            return Err(DatabaseError::command_failed(
                LIMIT_NOT_POSITIVE,
                "the limit must be positive",
            ));
        }

        let mut docs = documents;
        if let Some(path) = stage.unwind() {
            docs = Self::unwind(path, docs);
        }
        if let Some(selector) = stage.selector() {
            docs = Self::filter(selector, docs)?;
        }
        if let Some(sort) = stage.sort() {
            ValueSorter::sort(&mut docs, sort);
        }
        if let Some(skip) = stage.skip() {
            docs = docs.into_iter().skip(to_usize(skip)).collect();
        }
        if let Some(limit) = stage.limit() {
            docs.truncate(to_usize(limit));
        }
        if let Some(fields) = stage.projection() {
            docs = Self::project(fields, docs)?;
        }

        Self::group(stage.group(), &docs)
    }

    /// Buckets documents by `_id` and computes accumulators per bucket.
    /// Buckets are emitted in the order their key is first seen.
    pub fn group(expression: &Value, documents: &[Value]) -> DatabaseResult<Vec<Value>> {
        let spec = expression.as_object().ok_or_else(|| {
            DatabaseError::command_failed(
                GROUP_NOT_OBJECT,
                "a group's fields must be specified in an object",
            )
        })?;
        let id_expression = spec.get("_id").ok_or_else(|| {
            DatabaseError::command_failed(GROUP_MISSING_ID, "a group specification must include an _id")
        })?;

        let mut fields = Vec::new();
        for (name, definition) in spec.iter().filter(|(name, _)| *name != "_id") {
            fields.push((name.clone(), AccumulatorSpec::parse(name, definition)?));
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut buckets: Vec<(Value, Vec<Accumulator>)> = Vec::new();

        for document in documents {
            let key = evaluate(id_expression, document)?.unwrap_or(Value::Null);
            let bucket = bucket_key(&key);
            let slot = match index.get(&bucket) {
                Some(slot) => *slot,
                None => {
                    index.insert(bucket, buckets.len());
                    let accumulators = fields.iter().map(|(_, spec)| spec.start()).collect();
                    buckets.push((key, accumulators));
                    buckets.len() - 1
                }
            };

            for ((_, spec), accumulator) in fields.iter().zip(buckets[slot].1.iter_mut()) {
                accumulator.add(evaluate(&spec.operand, document)?);
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(key, accumulators)| {
                let mut output = Map::new();
                output.insert("_id".to_string(), key);
                for ((name, _), accumulator) in fields.iter().zip(accumulators) {
                    output.insert(name.clone(), accumulator.finish());
                }
                Value::Object(output)
            })
            .collect())
    }

    /// One output document per element of the array at `path`.
    /// Missing, null and empty arrays drop the document; scalars pass through.
    pub fn unwind(path: &str, documents: Vec<Value>) -> Vec<Value> {
        let field = path.trim_start_matches(FIELD_PATH_PREFIX);
        let mut output = Vec::with_capacity(documents.len());

        for document in documents {
            let items = match resolve_path(&document, field) {
                None | Some(Value::Null) => continue,
                Some(Value::Array(items)) => Some(items.clone()),
                Some(_) => None,
            };
            match items {
                Some(items) => {
                    for item in items {
                        let mut copy = document.clone();
                        set_path(&mut copy, field, item);
                        output.push(copy);
                    }
                }
                None => output.push(document),
            }
        }

        output
    }

    pub fn filter(selector: &Map<String, Value>, documents: Vec<Value>) -> DatabaseResult<Vec<Value>> {
        let mut output = Vec::with_capacity(documents.len());
        for document in documents {
            if SelectorFilter::matches(&document, selector)? {
                output.push(document);
            }
        }
        Ok(output)
    }

    /// Inclusion keeps listed fields plus `_id` unless `_id` is excluded.
    /// Exclusion drops listed fields.
    pub fn project(fields: &FieldSpec, documents: Vec<Value>) -> DatabaseResult<Vec<Value>> {
        let inclusion = fields.is_inclusion();
        if inclusion {
            if let Some((field, _)) = fields
                .fields()
                .iter()
                .find(|(f, included)| !included && f != "_id")
            {
                return Err(DatabaseError::command_failed(
                    PROJECTION_MIXED,
                    format!("Cannot do exclusion on field {} in inclusion projection", field),
                ));
            }
        }

        Ok(documents
            .into_iter()
            .map(|document| {
                if inclusion {
                    let mut output = Value::Object(Map::new());
                    let keep_id = fields.get("_id").unwrap_or(true);
                    if keep_id {
                        if let Some(id) = document.get("_id") {
                            set_path(&mut output, "_id", id.clone());
                        }
                    }
                    for (field, _) in fields.fields().iter().filter(|(f, inc)| *inc && f != "_id") {
                        if let Some(value) = resolve_path(&document, field) {
                            set_path(&mut output, field, value.clone());
                        }
                    }
                    output
                } else {
                    let mut output = document;
                    for (field, _) in fields.fields() {
                        remove_path(&mut output, field);
                    }
                    output
                }
            })
            .collect())
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Hash key of a group `_id`. Numbers that compare equal (`1`, `1.0`) share
/// a key; object keys keep their order.
fn bucket_key(value: &Value) -> String {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return i.to_string();
            }
            if let Some(u) = n.as_u64() {
                return u.to_string();
            }
            let f = n.as_f64().unwrap_or(0.0);
            if f.fract() == 0.0 && f.abs() < INTEGRAL_FLOAT_LIMIT {
                (f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(bucket_key).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), bucket_key(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        other => other.to_string(),
    }
}

/// Evaluates an expression against a document. `None` means missing.
fn evaluate(expression: &Value, document: &Value) -> DatabaseResult<Option<Value>> {
    match expression {
        Value::String(s) if s.starts_with(FIELD_PATH_PREFIX) => {
            Ok(resolve_path(document, &s[1..]).cloned())
        }
        Value::Object(map) => {
            if let Some(op) = map.keys().find(|k| k.starts_with(FIELD_PATH_PREFIX)) {
                return Err(DatabaseError::command_failed(
                    UNRECOGNIZED_EXPRESSION,
                    format!("Unrecognized expression '{}'", op),
                ));
            }
            let mut output = Map::new();
            for (key, inner) in map {
                if let Some(value) = evaluate(inner, document)? {
                    output.insert(key.clone(), value);
                }
            }
            Ok(Some(Value::Object(output)))
        }
        Value::Array(items) => {
            let mut output = Vec::with_capacity(items.len());
            for item in items {
                output.push(evaluate(item, document)?.unwrap_or(Value::Null));
            }
            Ok(Some(Value::Array(output)))
        }
        constant => Ok(Some(constant.clone())),
    }
}

/// Writes `value` at a dotted path, creating intermediate objects
fn set_path(document: &mut Value, path: &str, value: Value) {
    let Value::Object(map) = document else {
        return;
    };
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            set_path(child, rest, value);
        }
    }
}

fn remove_path(document: &mut Value, path: &str) {
    let Value::Object(map) = document else {
        return;
    };
    match path.split_once('.') {
        None => {
            map.remove(path);
        }
        Some((head, rest)) => {
            if let Some(child) = map.get_mut(head) {
                remove_path(child, rest);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccumulatorKind {
    Sum,
    Avg,
    Min,
    Max,
    First,
    Last,
    Push,
    AddToSet,
}

impl AccumulatorKind {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "$sum" => Some(Self::Sum),
            "$avg" => Some(Self::Avg),
            "$min" => Some(Self::Min),
            "$max" => Some(Self::Max),
            "$first" => Some(Self::First),
            "$last" => Some(Self::Last),
            "$push" => Some(Self::Push),
            "$addToSet" => Some(Self::AddToSet),
            _ => None,
        }
    }
}

/// `{<accumulator>: <operand>}` for one output field
#[derive(Debug, Clone)]
struct AccumulatorSpec {
    kind: AccumulatorKind,
    operand: Value,
}

impl AccumulatorSpec {
    fn parse(field: &str, definition: &Value) -> DatabaseResult<Self> {
        let (name, operand) = definition
            .as_object()
            .filter(|map| map.len() == 1)
            .and_then(|map| map.iter().next())
            .ok_or_else(|| {
                DatabaseError::command_failed(
                    ACCUMULATOR_NOT_OBJECT,
                    format!("The field '{}' must be an accumulator object", field),
                )
            })?;
        let kind = AccumulatorKind::parse(name).ok_or_else(|| {
            DatabaseError::command_failed(
                UNKNOWN_GROUP_OPERATOR,
                format!("unknown group operator '{}'", name),
            )
        })?;
        Ok(Self {
            kind,
            operand: operand.clone(),
        })
    }

    fn start(&self) -> Accumulator {
        match self.kind {
            AccumulatorKind::Sum => Accumulator::Sum {
                int: Some(0),
                float: 0.0,
            },
            AccumulatorKind::Avg => Accumulator::Avg { total: 0.0, count: 0 },
            AccumulatorKind::Min => Accumulator::Extremum { best: None, keep_greater: false },
            AccumulatorKind::Max => Accumulator::Extremum { best: None, keep_greater: true },
            AccumulatorKind::First => Accumulator::First(None),
            AccumulatorKind::Last => Accumulator::Last(None),
            AccumulatorKind::Push => Accumulator::Push(Vec::new()),
            AccumulatorKind::AddToSet => Accumulator::AddToSet(Vec::new()),
        }
    }
}

/// Running state of one accumulator within one bucket
#[derive(Debug, Clone)]
enum Accumulator {
    /// `int` stays `Some` while every input is an integer and no overflow happened
    Sum { int: Option<i64>, float: f64 },
    Avg { total: f64, count: u64 },
    Extremum { best: Option<Value>, keep_greater: bool },
    First(Option<Value>),
    Last(Option<Value>),
    Push(Vec<Value>),
    AddToSet(Vec<Value>),
}

impl Accumulator {
    fn add(&mut self, value: Option<Value>) {
        match self {
            Accumulator::Sum { int, float } => {
                if let Some(Value::Number(n)) = &value {
                    *float += n.as_f64().unwrap_or(0.0);
                    *int = match (*int, n.as_i64()) {
                        (Some(total), Some(v)) => total.checked_add(v),
                        _ => None,
                    };
                }
            }
            Accumulator::Avg { total, count } => {
                if let Some(Value::Number(n)) = &value {
                    *total += n.as_f64().unwrap_or(0.0);
                    *count += 1;
                }
            }
            Accumulator::Extremum { best, keep_greater } => {
                let Some(candidate) = value.filter(|v| !v.is_null()) else {
                    return;
                };
                let replace = match best.as_ref() {
                    None => true,
                    Some(current) => {
                        let ordering = ValueSorter::compare(Some(&candidate), Some(current));
                        if *keep_greater {
                            ordering.is_gt()
                        } else {
                            ordering.is_lt()
                        }
                    }
                };
                if replace {
                    *best = Some(candidate);
                }
            }
            Accumulator::First(first) => {
                if first.is_none() {
                    *first = Some(value.unwrap_or(Value::Null));
                }
            }
            Accumulator::Last(last) => *last = Some(value.unwrap_or(Value::Null)),
            Accumulator::Push(items) => {
                if let Some(v) = value {
                    items.push(v);
                }
            }
            Accumulator::AddToSet(items) => {
                if let Some(v) = value {
                    if !items.contains(&v) {
                        items.push(v);
                    }
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::Sum { int: Some(total), .. } => Value::from(total),
            Accumulator::Sum { float, .. } => float_value(float),
            Accumulator::Avg { count: 0, .. } => Value::Null,
            Accumulator::Avg { total, count } => float_value(total / count as f64),
            Accumulator::Extremum { best, .. } => best.unwrap_or(Value::Null),
            Accumulator::First(v) | Accumulator::Last(v) => v.unwrap_or(Value::Null),
            Accumulator::Push(items) | Accumulator::AddToSet(items) => Value::Array(items),
        }
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

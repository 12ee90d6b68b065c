//! CLI command implementations
//!
//! Both commands load the config, read one request from stdin and write one
//! response to stdout. `run` loads the target collection into a
//! [`MemorySession`] and executes the aggregate; `explain` only builds it.

use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::aggregate::Aggregate;
use crate::criteria::{Criteria, SortDirection};
use crate::observability::Logger;
use crate::session::MemorySession;

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// One aggregate request
///
/// ```json
/// {"collection": "bands", "group": {"_id": "$genre"}, "sort": [["name", -1]], "limit": 10}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateRequest {
    pub collection: String,
    pub group: Value,
    #[serde(default)]
    pub unwind: Option<String>,
    /// Document type name shown by explain
    #[serde(default = "default_klass")]
    pub klass: String,
    #[serde(default)]
    pub selector: Map<String, Value>,
    /// `[field, 1 | -1]` pairs, applied left to right
    #[serde(default)]
    pub sort: Vec<(String, i64)>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub skip: Option<u64>,
    /// Fields to keep
    #[serde(default)]
    pub fields: Vec<String>,
}

fn default_klass() -> String {
    "Document".to_string()
}

impl AggregateRequest {
    pub fn from_value(value: Value) -> CliResult<Self> {
        if !value.is_object() {
            return Err(CliError::invalid_request("Request must be a JSON object"));
        }
        serde_json::from_value(value).map_err(|e| CliError::invalid_request(e.to_string()))
    }

    /// Criteria equivalent to the request's selector and options
    pub fn criteria(&self) -> CliResult<Criteria> {
        let mut criteria = Criteria::new(self.klass.clone()).with_selector(self.selector.clone());

        for (field, direction) in &self.sort {
            if *direction != 1 && *direction != -1 {
                return Err(CliError::invalid_request(format!(
                    "Sort direction for '{}' must be 1 or -1, got {}",
                    field, direction
                )));
            }
            criteria = criteria.order_by(field.clone(), SortDirection::from_i64(*direction));
        }
        if let Some(limit) = self.limit {
            criteria = criteria.limit(limit);
        }
        if let Some(skip) = self.skip {
            criteria = criteria.skip(skip);
        }
        if !self.fields.is_empty() {
            criteria = criteria.only(self.fields.iter().cloned());
        }
        Ok(criteria)
    }
}

/// Main CLI entry point; the only function main.rs calls
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Runs a command, writing an error response if it fails
pub fn run_command(cmd: Command) -> CliResult<()> {
    let result = match cmd {
        Command::Run { config } => run_aggregate(&config),
        Command::Explain { config } => explain(&config),
    };

    if let Err(err) = &result {
        Logger::error(
            "CLI_COMMAND_FAILED",
            &[("code", err.code_str()), ("message", err.message())],
        );
        write_error(err.code_str(), err.message())?;
    }
    result
}

/// Execute one aggregate request from stdin
pub fn run_aggregate(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity());

    let request = AggregateRequest::from_value(read_request()?)?;
    write_response(execute_request(&config, &request)?)
}

/// Explain one aggregate request from stdin
pub fn explain(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity());

    let request = AggregateRequest::from_value(read_request()?)?;
    write_response(explain_request(&request)?)
}

/// Runs a request against the configured data directory.
///
/// Returns `{"command": ..., "documents": [...]}`.
pub fn execute_request(config: &Config, request: &AggregateRequest) -> CliResult<Value> {
    let criteria = request.criteria()?;

    let mut session = MemorySession::new();
    session.insert_many(
        request.collection.as_str(),
        config.load_collection(&request.collection)?,
    );

    let collection = session.collection(request.collection.as_str());
    let aggregate = Aggregate::new(
        &collection,
        &criteria,
        request.group.clone(),
        request.unwind.as_deref(),
    )?;

    let documents = aggregate.documents()?.to_vec();
    Ok(json!({
        "command": aggregate.command().to_value(),
        "documents": documents,
    }))
}

/// Builds a request's command without touching any data.
///
/// Returns `{"command": ..., "explain": "<text>"}`.
pub fn explain_request(request: &AggregateRequest) -> CliResult<Value> {
    let criteria = request.criteria()?;
    let session = MemorySession::new();
    let collection = session.collection(request.collection.as_str());
    let aggregate = Aggregate::new(
        &collection,
        &criteria,
        request.group.clone(),
        request.unwind.as_deref(),
    )?;

    Ok(json!({
        "command": aggregate.command().to_value(),
        "explain": aggregate.explain().to_string(),
    }))
}

//! In-memory session
//!
//! Holds named collections of JSON documents and answers aggregate commands
//! by evaluating them locally. Every call is counted, failed ones included.

use std::cell::Cell;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::observability::Logger;
use crate::pipeline::AggregateCommand;

use super::errors::DatabaseResult;
use super::evaluator::PipelineEvaluator;
use super::{Collection, CommandResponse, Consistency, Session, RESULT_KEY};

/// Session over in-memory collections
#[derive(Debug, Default)]
pub struct MemorySession {
    collections: BTreeMap<String, Vec<Value>>,
    commands_executed: Cell<usize>,
    last_consistency: Cell<Option<Consistency>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a document to a collection, creating it if needed
    pub fn insert(&mut self, collection: impl Into<String>, document: Value) {
        self.collections
            .entry(collection.into())
            .or_default()
            .push(document);
    }

    pub fn insert_many<I>(&mut self, collection: impl Into<String>, documents: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.collections
            .entry(collection.into())
            .or_default()
            .extend(documents);
    }

    /// Documents stored in a collection; unknown collections are empty
    pub fn documents(&self, collection: &str) -> &[Value] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Collection names, sorted
    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    /// Handle for one collection of this session
    pub fn collection(&self, name: impl Into<String>) -> MemoryCollection<'_> {
        MemoryCollection {
            name: name.into(),
            session: self,
        }
    }

    /// Number of commands received so far
    pub fn commands_executed(&self) -> usize {
        self.commands_executed.get()
    }

    /// Consistency requested by the most recent command
    pub fn last_consistency(&self) -> Option<Consistency> {
        self.last_consistency.get()
    }
}

impl Session for MemorySession {
    fn command(
        &self,
        command: &AggregateCommand,
        consistency: Consistency,
    ) -> DatabaseResult<CommandResponse> {
        self.commands_executed.set(self.commands_executed.get() + 1);
        self.last_consistency.set(Some(consistency));

        let source = self.documents(command.collection());
        let count = source.len().to_string();
        Logger::trace(
            "MEMORY_COMMAND",
            &[
                ("collection", command.collection()),
                ("consistency", consistency.as_str()),
                ("input_documents", count.as_str()),
            ],
        );

        let mut documents = source.to_vec();
        for stage in command.pipeline() {
            documents = PipelineEvaluator::run(stage, documents)?;
        }

        let mut response = Map::new();
        response.insert(RESULT_KEY.to_string(), Value::Array(documents));
        response.insert("ok".to_string(), Value::from(1.0));
        Ok(response)
    }
}

/// A named collection backed by a [`MemorySession`]
#[derive(Debug, Clone)]
pub struct MemoryCollection<'a> {
    name: String,
    session: &'a MemorySession,
}

impl Collection for MemoryCollection<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn session(&self) -> &dyn Session {
        self.session
    }
}

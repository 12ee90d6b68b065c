//! Aggregate executor
//!
//! The command is built once in [`Aggregate::new`]. The first
//! result-dependent call sends it through the collection's session with
//! strong consistency and caches the full reply; every later call reads the
//! cache. A failed call leaves the cache empty, so the next call tries again.

use std::cell::OnceCell;
use std::ops::Range;

use serde_json::Value;

use crate::criteria::Criteria;
use crate::observability::{Logger, Severity};
use crate::pipeline::{AggregateCommand, AggregateExplain, CommandBuilder, PipelineResult};
use crate::session::{Collection, CommandResponse, Consistency, DatabaseResult};

use super::documents::Documents;

/// A grouping aggregation over one collection.
///
/// Not `Sync`: the cache is a `OnceCell`. Wrap it in your own lock to share
/// it across threads.
pub struct Aggregate<'a, C: Collection + ?Sized> {
    collection: &'a C,
    criteria: &'a Criteria,
    command: AggregateCommand,
    results: OnceCell<CommandResponse>,
}

impl<'a, C: Collection + ?Sized> Aggregate<'a, C> {
    /// Builds the command for `group` (and `unwind`, if any) under `criteria`.
    ///
    /// Nothing is sent to the database here.
    pub fn new(
        collection: &'a C,
        criteria: &'a Criteria,
        group: Value,
        unwind: Option<&str>,
    ) -> PipelineResult<Self> {
        let command = CommandBuilder::new(collection.name(), group)
            .unwind(unwind)
            .criteria(criteria)
            .build()?;

        if Logger::enabled(Severity::Trace) {
            let stages = command
                .stage()
                .tags()
                .iter()
                .map(|t| t.key())
                .collect::<Vec<_>>()
                .join(",");
            Logger::trace(
                "AGGREGATE_COMMAND_BUILT",
                &[
                    ("collection", command.collection()),
                    ("klass", criteria.klass()),
                    ("stages", stages.as_str()),
                ],
            );
        }

        Ok(Self {
            collection,
            criteria,
            command,
            results: OnceCell::new(),
        })
    }

    /// The command this aggregate sends
    pub fn command(&self) -> &AggregateCommand {
        &self.command
    }

    pub fn criteria(&self) -> &Criteria {
        self.criteria
    }

    /// Full reply of the command, fetched on first call
    pub fn raw(&self) -> DatabaseResult<&CommandResponse> {
        if let Some(cached) = self.results.get() {
            Logger::trace(
                "AGGREGATE_CACHE_HIT",
                &[("collection", self.command.collection())],
            );
            return Ok(cached);
        }

        let response = self
            .collection
            .session()
            .command(&self.command, Consistency::Strong)
            .map_err(|err| {
                Logger::error(
                    "AGGREGATE_FAILED",
                    &[
                        ("collection", self.command.collection()),
                        ("code", err.code()),
                        ("error", err.to_string().as_str()),
                    ],
                );
                err
            })?;

        let returned = Documents::from_response(&response).len().to_string();
        Logger::info(
            "AGGREGATE_EXECUTED",
            &[
                ("collection", self.command.collection()),
                ("consistency", Consistency::Strong.as_str()),
                ("documents", returned.as_str()),
            ],
        );

        Ok(self.results.get_or_init(|| response))
    }

    /// Same as [`Aggregate::raw`]
    pub fn execute(&self) -> DatabaseResult<&CommandResponse> {
        self.raw()
    }

    /// Whether the reply is cached
    pub fn is_executed(&self) -> bool {
        self.results.get().is_some()
    }

    /// Result documents
    pub fn documents(&self) -> DatabaseResult<Documents<'_>> {
        self.raw().map(Documents::from_response)
    }

    /// Every result document, materialized
    pub fn all(&self) -> DatabaseResult<&[Value]> {
        Ok(self.documents()?.as_slice())
    }

    /// Calls `visitor` once per document, in result order
    pub fn each<F>(&self, visitor: F) -> DatabaseResult<()>
    where
        F: FnMut(&Value),
    {
        self.documents()?.each(visitor);
        Ok(())
    }

    /// Iterator over the documents. Each call starts from the first one.
    pub fn iter(&self) -> DatabaseResult<std::slice::Iter<'_, Value>> {
        Ok(self.documents()?.iter())
    }

    pub fn get(&self, index: usize) -> DatabaseResult<Option<&Value>> {
        Ok(self.all()?.get(index))
    }

    /// Documents in `range`.
    ///
    /// `None` when the range starts past the end; empty when it starts
    /// exactly at the end. The end is clamped.
    pub fn slice(&self, range: Range<usize>) -> DatabaseResult<Option<&[Value]>> {
        let all = self.all()?;
        if range.start > all.len() {
            return Ok(None);
        }
        let end = range.end.min(all.len()).max(range.start);
        Ok(Some(&all[range.start..end]))
    }

    pub fn is_empty(&self) -> DatabaseResult<bool> {
        Ok(self.documents()?.is_empty())
    }

    /// Compares result documents with another aggregate, in order.
    ///
    /// Runs both commands if needed.
    pub fn documents_eq<D: Collection + ?Sized>(
        &self,
        other: &Aggregate<'_, D>,
    ) -> DatabaseResult<bool> {
        Ok(self.documents()? == other.documents()?)
    }

    /// Describes the aggregate without running it
    pub fn explain(&self) -> AggregateExplain {
        AggregateExplain::new(&self.command, self.criteria)
    }
}

impl<C: Collection + ?Sized> std::fmt::Debug for Aggregate<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregate")
            .field("collection", &self.collection.name())
            .field("command", &self.command)
            .field("executed", &self.is_executed())
            .finish()
    }
}

//! Aggregate Execution Tests
//!
//! Tests for the execute-once contract and result access:
//! - The command is sent at most once per aggregate, with strong consistency
//! - A failed fetch caches nothing and can be retried
//! - Result accessors all read the same cached documents

use std::cell::{Cell, RefCell};

use docagg::pipeline::AggregateCommand;
use docagg::{
    Aggregate, Collection, CommandResponse, Consistency, Criteria, DatabaseError, DatabaseResult,
    MemorySession, Session, SortDirection,
};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn bands_session() -> MemorySession {
    let mut session = MemorySession::new();
    session.insert_many(
        "bands",
        vec![
            json!({"name": "Depeche Mode", "genre": "rock", "likes": 200, "tags": ["synth", "live"]}),
            json!({"name": "Tool", "genre": "rock", "likes": 100, "tags": ["prog", "live"]}),
            json!({"name": "Parliament", "genre": "funk", "likes": 50, "tags": []}),
        ],
    );
    session
}

fn likes_by_genre() -> Value {
    json!({"_id": "$genre", "totalLikes": {"$sum": "$likes"}})
}

/// Session that fails a fixed number of times, then replies
struct FlakySession {
    failures_left: Cell<usize>,
    reply: Value,
    calls: Cell<usize>,
    seen: RefCell<Vec<Consistency>>,
}

impl FlakySession {
    fn new(failures: usize, reply: Value) -> Self {
        Self {
            failures_left: Cell::new(failures),
            reply,
            calls: Cell::new(0),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Session for FlakySession {
    fn command(
        &self,
        _command: &AggregateCommand,
        consistency: Consistency,
    ) -> DatabaseResult<CommandResponse> {
        self.calls.set(self.calls.get() + 1);
        self.seen.borrow_mut().push(consistency);
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(DatabaseError::Unavailable("no primary".to_string()));
        }
        Ok(self.reply.as_object().cloned().unwrap_or_default())
    }
}

struct Remote<'s> {
    session: &'s FlakySession,
}

impl Collection for Remote<'_> {
    fn name(&self) -> &str {
        "bands"
    }

    fn session(&self) -> &dyn Session {
        self.session
    }
}

// =============================================================================
// Scenario
// =============================================================================

/// rock 200 + 100 and funk 50 group into two totals.
#[test]
fn test_likes_grouped_by_genre() {
    let session = bands_session();
    let bands = session.collection("bands");
    let criteria = Criteria::new("Band");
    let aggregate = Aggregate::new(&bands, &criteria, likes_by_genre(), None).unwrap();

    assert_eq!(
        aggregate.all().unwrap(),
        &[
            json!({"_id": "rock", "totalLikes": 300}),
            json!({"_id": "funk", "totalLikes": 50}),
        ]
    );
}

/// Unwind flattens a source array before grouping on it.
#[test]
fn test_unwind_source_array_then_group() {
    let session = bands_session();
    let bands = session.collection("bands");
    let criteria = Criteria::new("Band");
    let aggregate = Aggregate::new(
        &bands,
        &criteria,
        json!({"_id": "$tags", "n": {"$sum": 1}}),
        Some("tags"),
    )
    .unwrap();

    assert_eq!(
        aggregate.all().unwrap(),
        &[
            json!({"_id": "synth", "n": 1}),
            json!({"_id": "live", "n": 2}),
            json!({"_id": "prog", "n": 1}),
        ]
    );
}

/// The selector filters source documents on their own fields.
#[test]
fn test_selector_filters_source_documents() {
    let session = bands_session();
    let bands = session.collection("bands");
    let criteria = Criteria::new("Band").where_eq("genre", json!("rock"));
    let aggregate = Aggregate::new(&bands, &criteria, likes_by_genre(), None).unwrap();

    assert_eq!(
        aggregate.all().unwrap(),
        &[json!({"_id": "rock", "totalLikes": 300})]
    );
}

/// Sort, skip and limit pick source documents before they are grouped.
#[test]
fn test_sort_and_limit_select_source_documents() {
    let session = bands_session();
    let bands = session.collection("bands");
    let criteria = Criteria::new("Band")
        .order_by("name", SortDirection::Desc)
        .limit(2);
    let aggregate = Aggregate::new(&bands, &criteria, likes_by_genre(), None).unwrap();

    // name desc: Tool, Parliament, Depeche Mode; limit 2 drops Depeche Mode
    assert_eq!(
        aggregate.all().unwrap(),
        &[
            json!({"_id": "rock", "totalLikes": 100}),
            json!({"_id": "funk", "totalLikes": 50}),
        ]
    );
}

// =============================================================================
// Execute-Once Contract
// =============================================================================

/// Repeated access hits the session once.
#[test]
fn test_results_memoized() {
    let session = bands_session();
    let bands = session.collection("bands");
    let criteria = Criteria::new("Band");
    let aggregate = Aggregate::new(&bands, &criteria, likes_by_genre(), None).unwrap();

    let first = aggregate.all().unwrap().to_vec();
    let second = aggregate.all().unwrap().to_vec();
    assert_eq!(first, second);

    let mut visited = 0;
    aggregate.each(|_| visited += 1).unwrap();
    assert_eq!(visited, 2);
    assert_eq!(aggregate.iter().unwrap().count(), 2);
    assert_eq!(aggregate.iter().unwrap().count(), 2);
    aggregate.raw().unwrap();
    aggregate.execute().unwrap();

    assert_eq!(session.commands_executed(), 1);
}

/// Strong consistency is requested.
#[test]
fn test_strong_consistency_requested() {
    let session = bands_session();
    let bands = session.collection("bands");
    let criteria = Criteria::new("Band");
    let aggregate = Aggregate::new(&bands, &criteria, likes_by_genre(), None).unwrap();

    aggregate.is_empty().unwrap();
    assert_eq!(session.last_consistency(), Some(Consistency::Strong));
}

/// A failure is returned unchanged, caches nothing, and the next call retries.
#[test]
fn test_failed_fetch_can_retry() {
    let session = FlakySession::new(1, json!({"result": [{"_id": "rock"}], "ok": 1.0}));
    let remote = Remote { session: &session };
    let criteria = Criteria::new("Band");
    let aggregate = Aggregate::new(&remote, &criteria, likes_by_genre(), None).unwrap();

    let err = aggregate.all().unwrap_err();
    assert_eq!(err, DatabaseError::Unavailable("no primary".to_string()));
    assert!(err.is_retryable());
    assert!(!aggregate.is_executed());

    assert_eq!(aggregate.all().unwrap(), &[json!({"_id": "rock"})]);
    assert!(aggregate.is_executed());
    aggregate.all().unwrap();

    assert_eq!(session.calls.get(), 2);
    assert_eq!(*session.seen.borrow(), vec![Consistency::Strong; 2]);
}

/// A reply with no "result" key means zero documents.
#[test]
fn test_missing_result_is_empty() {
    let session = FlakySession::new(0, json!({"ok": 1.0}));
    let remote = Remote { session: &session };
    let criteria = Criteria::new("Band");
    let aggregate = Aggregate::new(&remote, &criteria, likes_by_genre(), None).unwrap();

    assert!(aggregate.is_empty().unwrap());
    assert!(aggregate.all().unwrap().is_empty());
    assert_eq!(aggregate.raw().unwrap().get("ok"), Some(&json!(1.0)));
}

/// A malformed group surfaces as a command failure.
#[test]
fn test_invalid_group_fails_at_execution() {
    let session = bands_session();
    let bands = session.collection("bands");
    let criteria = Criteria::new("Band");
    let aggregate = Aggregate::new(&bands, &criteria, json!({"total": {"$sum": 1}}), None).unwrap();

    match aggregate.all().unwrap_err() {
        DatabaseError::CommandFailed { code, .. } => assert_eq!(code, 15955),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!aggregate.is_executed());
}

// =============================================================================
// Result Access
// =============================================================================

/// is_empty agrees with all().
#[test]
fn test_is_empty_matches_all() {
    let session = bands_session();
    let bands = session.collection("bands");

    let some = Criteria::new("Band");
    let none = Criteria::new("Band").where_eq("genre", json!("jazz"));
    for criteria in [&some, &none] {
        let aggregate = Aggregate::new(&bands, criteria, likes_by_genre(), None).unwrap();
        assert_eq!(aggregate.is_empty().unwrap(), aggregate.all().unwrap().is_empty());
    }
}

/// Equivalent aggregates over equivalent data compare equal.
#[test]
fn test_equivalent_aggregates_equal() {
    let left_session = bands_session();
    let right_session = bands_session();
    let left_bands = left_session.collection("bands");
    let right_bands = right_session.collection("bands");
    let criteria = Criteria::new("Band").order_by("likes", SortDirection::Desc);

    let left = Aggregate::new(&left_bands, &criteria, likes_by_genre(), None).unwrap();
    let right = Aggregate::new(&right_bands, &criteria, likes_by_genre(), None).unwrap();
    assert!(left.documents_eq(&right).unwrap());

    let reversed = Criteria::new("Band").order_by("likes", SortDirection::Asc);
    let other = Aggregate::new(&right_bands, &reversed, likes_by_genre(), None).unwrap();
    assert!(!left.documents_eq(&other).unwrap());
}

/// Index and range access follow slice rules.
#[test]
fn test_indexed_access() {
    let session = bands_session();
    let bands = session.collection("bands");
    let criteria = Criteria::new("Band");
    let aggregate = Aggregate::new(&bands, &criteria, likes_by_genre(), None).unwrap();

    assert_eq!(aggregate.get(1).unwrap(), Some(&json!({"_id": "funk", "totalLikes": 50})));
    assert_eq!(aggregate.get(2).unwrap(), None);
    assert_eq!(aggregate.slice(0..1).unwrap().map(<[Value]>::len), Some(1));
    assert_eq!(aggregate.slice(1..9).unwrap().map(<[Value]>::len), Some(1));
    assert_eq!(aggregate.slice(2..3).unwrap().map(<[Value]>::len), Some(0));
    assert_eq!(aggregate.slice(3..4).unwrap(), None);

    let documents = aggregate.documents().unwrap();
    assert_eq!(documents[0]["_id"], "rock");
    assert_eq!(documents.into_iter().count(), documents.iter().count());
}

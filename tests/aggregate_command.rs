//! Aggregate Command Tests
//!
//! Tests for command assembly:
//! - Criteria options map onto stage entries with exact values
//! - Absent or empty options add no entry
//! - Stage keys serialize in fixed order
//! - Building never touches the session

use docagg::criteria::Selector;
use docagg::pipeline::{CommandBuilder, PipelineErrorCode, StageTag};
use docagg::{Aggregate, Collection, Criteria, MemorySession, SortDirection};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn group() -> Value {
    json!({"_id": "$genre", "totalLikes": {"$sum": "$likes"}})
}

fn command_for(criteria: &Criteria, unwind: Option<&str>) -> Value {
    let session = MemorySession::new();
    let bands = session.collection("bands");
    let aggregate = Aggregate::new(&bands, criteria, group(), unwind).unwrap();
    aggregate.command().to_value()
}

fn selector(value: Value) -> Selector {
    value.as_object().cloned().unwrap()
}

fn stage_of(command: &Value) -> &serde_json::Map<String, Value> {
    command["pipeline"][0].as_object().unwrap()
}

// =============================================================================
// Scenario Commands
// =============================================================================

/// No options: only the group entry.
#[test]
fn test_base_command() {
    let command = command_for(&Criteria::new("Band"), None);
    assert_eq!(
        command,
        json!({
            "aggregate": "bands",
            "pipeline": [{"$group": {"_id": "$genre", "totalLikes": {"$sum": "$likes"}}}]
        })
    );
}

/// limit(10) adds `$limit: 10`.
#[test]
fn test_limit_entry() {
    let command = command_for(&Criteria::new("Band").limit(10), None);
    assert_eq!(stage_of(&command)["$limit"], json!(10));
}

/// Descending sort on name adds `$sort: {name: -1}`.
#[test]
fn test_sort_entry() {
    let criteria = Criteria::new("Band").order_by("name", SortDirection::Desc);
    let command = command_for(&criteria, None);
    assert_eq!(stage_of(&command)["$sort"], json!({"name": -1}));
}

/// skip(20) adds `$skip: 20`.
#[test]
fn test_skip_entry() {
    let command = command_for(&Criteria::new("Band").skip(20), None);
    assert_eq!(stage_of(&command)["$skip"], json!(20));
}

/// only(name) adds `$project: {name: 1}`.
#[test]
fn test_project_entry() {
    let command = command_for(&Criteria::new("Band").only(["name"]), None);
    assert_eq!(stage_of(&command)["$project"], json!({"name": 1}));
}

/// Non-empty selector becomes `$match` verbatim.
#[test]
fn test_match_entry_present() {
    let criteria =
        Criteria::new("Band").with_selector(selector(json!({"genre": {"$in": ["rock", "funk"]}})));
    let command = command_for(&criteria, None);
    assert_eq!(
        stage_of(&command)["$match"],
        json!({"genre": {"$in": ["rock", "funk"]}})
    );
}

/// Empty selector, sort and projection add nothing.
#[test]
fn test_empty_options_absent() {
    let criteria = Criteria::new("Band")
        .with_selector(Selector::new())
        .with_sort(docagg::SortSpec::new())
        .only(Vec::<String>::new());
    let command = command_for(&criteria, None);
    let stage = stage_of(&command);
    assert_eq!(stage.len(), 1);
    assert!(stage.contains_key("$group"));
}

/// A zero limit is still present: presence decides, not value.
#[test]
fn test_zero_limit_kept() {
    let command = command_for(&Criteria::new("Band").limit(0), None);
    assert_eq!(stage_of(&command)["$limit"], json!(0));
}

/// Unwind field `f` becomes `"$f"`.
#[test]
fn test_unwind_prefixed() {
    let command = command_for(&Criteria::new("Band"), Some("members"));
    assert_eq!(stage_of(&command)["$unwind"], json!("$members"));

    let command = command_for(&Criteria::new("Band"), Some(""));
    assert!(!stage_of(&command).contains_key("$unwind"));
}

// =============================================================================
// Ordering and Determinism
// =============================================================================

/// Keys serialize as group, unwind, match, sort, limit, skip, project.
#[test]
fn test_stage_key_order() {
    let criteria = Criteria::new("Band")
        .only(["name"])
        .skip(5)
        .limit(10)
        .order_by("name", SortDirection::Asc)
        .where_eq("genre", json!("rock"));

    let session = MemorySession::new();
    let bands = session.collection("bands");
    let aggregate = Aggregate::new(&bands, &criteria, group(), Some("members")).unwrap();

    let text = serde_json::to_string(aggregate.command()).unwrap();
    let positions: Vec<usize> = StageTag::ORDER
        .iter()
        .map(|tag| text.find(&format!("\"{}\"", tag.key())).unwrap())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
    assert_eq!(aggregate.command().stage().tags(), StageTag::ORDER.to_vec());
}

/// The JSON value form keeps the serialized key order, sort keys included.
#[test]
fn test_value_form_keeps_key_order() {
    let criteria = Criteria::new("Band")
        .where_eq("genre", json!("rock"))
        .order_by("name", SortDirection::Desc)
        .order_by("likes", SortDirection::Asc)
        .limit(10);

    let session = MemorySession::new();
    let bands = session.collection("bands");
    let aggregate = Aggregate::new(&bands, &criteria, group(), Some("tags")).unwrap();
    let command = aggregate.command();

    assert_eq!(command.to_value().to_string(), serde_json::to_string(command).unwrap());

    let stage = command.to_value()["pipeline"][0].clone();
    let keys: Vec<&str> = stage.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["$group", "$unwind", "$match", "$sort", "$limit"]);
    let sort_keys: Vec<&str> = stage["$sort"].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(sort_keys, vec!["name", "likes"]);
}

/// Same inputs, same command.
#[test]
fn test_build_is_deterministic() {
    let criteria = Criteria::new("Band").limit(3).where_eq("genre", json!("rock"));
    assert_eq!(command_for(&criteria, Some("tags")), command_for(&criteria, Some("tags")));
}

/// Construction sends nothing.
#[test]
fn test_construction_issues_no_command() {
    let session = MemorySession::new();
    let bands = session.collection("bands");
    let criteria = Criteria::new("Band");
    let _aggregate = Aggregate::new(&bands, &criteria, group(), None).unwrap();
    assert_eq!(bands.name(), "bands");
    assert_eq!(session.commands_executed(), 0);
}

// =============================================================================
// Rejections
// =============================================================================

/// A group key that shadows a set stage entry is rejected.
#[test]
fn test_group_key_conflict_rejected() {
    let criteria = Criteria::new("Band").limit(10);
    let err = CommandBuilder::new("bands", json!({"_id": null, "$limit": 5}))
        .criteria(&criteria)
        .build()
        .unwrap_err();
    assert_eq!(err.code(), PipelineErrorCode::StageConflict);
    assert_eq!(err.key(), Some("$limit"));
}

/// The same key is harmless when the stage does not carry that entry.
#[test]
fn test_group_key_without_sibling_accepted() {
    let criteria = Criteria::new("Band");
    assert!(CommandBuilder::new("bands", json!({"_id": null, "$limit": 5}))
        .criteria(&criteria)
        .build()
        .is_ok());
}

/// Empty collection name is rejected.
#[test]
fn test_empty_collection_rejected() {
    let err = CommandBuilder::new("", group()).build().unwrap_err();
    assert_eq!(err.code(), PipelineErrorCode::InvalidTarget);
}

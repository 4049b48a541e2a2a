mod common;

use common::blob;
use gdsave_core::{
    detect_generation, upgrade, zeroed_scaffolding, Dict, EntryRecord, Generation, Node,
};

fn legacy_record() -> EntryRecord {
    let counters: Dict = [
        ("0", Node::Text("4".to_string())),
        ("1", Node::Text(String::new())),
        ("2", Node::Real(7.9)),
    ]
    .into_iter()
    .collect();
    let dict: Dict = [
        ("k2", Node::Text("Old".to_string())),
        ("k4", Node::Text(blob("1,1,2,15"))),
        ("k50", Node::Integer(23)),
        ("kI6", Node::Dict(counters)),
        ("k7", Node::Integer(99)),
    ]
    .into_iter()
    .collect();
    EntryRecord::from_dict(dict)
}

#[test]
fn detection_follows_markers() {
    assert_eq!(
        detect_generation("<d><k>k101</k><s>0,0</s></d>"),
        Generation::Current
    );
    assert_eq!(
        detect_generation("<?xml version=\"1.0\"?><plist version=\"1.0\" gjver=\"2.0\"><dict/>"),
        Generation::Current
    );
    assert_eq!(
        detect_generation("<d><k>k2</k><s>Old</s><k>k4</k><s>H4sIA</s></d>"),
        Generation::Legacy
    );
    assert_eq!(detect_generation(""), Generation::Legacy);
}

#[test]
fn detection_inspects_raw_blobs() {
    assert_eq!(detect_generation(&blob("1,1,2,15;")), Generation::Current);
    assert_eq!(detect_generation(&blob("kA13,0,kA14,")), Generation::Current);
    assert_eq!(detect_generation(&blob("1,1,2,15")), Generation::Legacy);
    assert_eq!(detect_generation("1,1,2,15;"), Generation::Current);
}

#[test]
fn upgrade_reaches_current_shape() {
    let mut record = legacy_record();
    let report = upgrade(&mut record);
    assert!(report.changed());
    let ids: Vec<&str> = report.steps.iter().map(|step| step.step_id).collect();
    assert_eq!(
        ids,
        [
            "slot_counters_to_integers",
            "insert_scaffolding",
            "format_version_to_current"
        ]
    );

    assert_eq!(record.format_version, Some(45));
    assert_eq!(record.scaffolding, Some(zeroed_scaffolding()));
    let counters = record.slot_counters.as_ref().expect("counters");
    assert_eq!(counters.get("0"), Some(&Node::Integer(4)));
    assert_eq!(counters.get("1"), Some(&Node::Integer(0)));
    assert_eq!(counters.get("2"), Some(&Node::Integer(7)));
    assert_eq!(record.extra.get("k7"), Some(&Node::Integer(99)));
}

#[test]
fn upgrade_is_idempotent() {
    let mut once = legacy_record();
    upgrade(&mut once);
    let mut twice = once.clone();
    let report = upgrade(&mut twice);
    assert!(!report.changed());
    assert_eq!(once, twice);
}

#[test]
fn upgrade_leaves_current_records_alone() {
    let mut record = EntryRecord::scaffold("Fresh", Generation::Current);
    let before = record.clone();
    assert!(!upgrade(&mut record).changed());
    assert_eq!(record, before);
}

use super::*;
use crate::crypto::decrypt_blob;

fn sample_dict() -> Dict {
    [
        ("k1", Node::Integer(7)),
        ("k2", Node::Text("Level A".to_string())),
        ("k4", Node::Text("H4sIAAAA".to_string())),
        ("k8", Node::Integer(3)),
        ("k23", Node::Integer(2)),
        ("kCEK", Node::Integer(4)),
        ("k66", Node::Text("not typed".to_string())),
    ]
    .into_iter()
    .collect()
}

#[test]
fn from_dict_splits_typed_and_residual_fields() {
    let record = EntryRecord::from_dict(sample_dict());
    assert_eq!(record.name.as_deref(), Some("Level A"));
    assert_eq!(record.official_song, Some(3));
    assert_eq!(record.length, Some(2));
    assert_eq!(record.star_request, None);
    assert_eq!(record.extra.get("k1"), Some(&Node::Integer(7)));
    assert_eq!(
        record.extra.get("k66"),
        Some(&Node::Text("not typed".to_string()))
    );
}

#[test]
fn dict_conversion_is_lossless() {
    let original = sample_dict();
    let record = EntryRecord::from_dict(original.clone());
    let rebuilt = record.into_dict();
    assert_eq!(rebuilt.len(), original.len());
    for (key, value) in original.iter() {
        assert_eq!(rebuilt.get(key), Some(value), "key {key} changed");
    }
}

#[test]
fn song_assignment_is_mutually_exclusive() {
    let mut record = EntryRecord::from_dict(sample_dict());
    record.set_song(SongRef::Custom(4));
    assert_eq!(record.custom_song, Some(4));
    assert_eq!(record.official_song, None);

    record.set_song(SongRef::Official(5));
    let dict = record.to_dict();
    assert_eq!(dict.get("k8"), Some(&Node::Integer(5)));
    assert!(!dict.contains_key("k45"));
}

#[test]
fn custom_song_wins_in_summary() {
    let mut record = EntryRecord::from_dict(sample_dict());
    record.custom_song = Some(900);
    let summary = record.summary("k_1");
    assert_eq!(summary.song_id, 900);
    assert!(summary.is_custom_song);

    let bare = EntryRecord::default().summary("k_2");
    assert_eq!(bare.name, "Unnamed");
    assert_eq!(bare.song_id, 0);
    assert!(!bare.is_custom_song);
    assert_eq!(bare.description, "");
    assert_eq!(bare.star_request, 0);
}

#[test]
fn overlay_keeps_unspecified_fields() {
    let mut record = EntryRecord::from_dict(sample_dict());
    let incoming = EntryRecord {
        payload: Some("H4sINEW".to_string()),
        custom_song: Some(12),
        ..EntryRecord::default()
    };
    record.overlay(incoming);

    assert_eq!(record.payload.as_deref(), Some("H4sINEW"));
    assert_eq!(record.name.as_deref(), Some("Level A"));
    assert_eq!(record.custom_song, Some(12));
    assert_eq!(record.official_song, None);
    assert_eq!(record.extra.get("kCEK"), Some(&Node::Integer(4)));
}

#[test]
fn apply_encodes_payload() {
    let mut record = EntryRecord::default();
    record.apply(FieldChanges {
        payload: Some("1,1,2,15;".to_string()),
        star_request: Some(6),
        ..FieldChanges::default()
    });
    let stored = record.payload.clone().expect("payload stored");
    assert!(crate::crypto::is_encoded_blob(&stored));
    let Ok(decoded) = decrypt_blob(&stored);
    assert_eq!(decoded, "1,1,2,15;");
    assert_eq!(record.star_request, Some(6));
}

#[test]
fn scaffold_carries_generation_version() {
    let current = EntryRecord::scaffold("Imported 1", Generation::Current);
    assert_eq!(current.format_version, Some(45));
    assert_eq!(current.scaffolding.as_deref(), Some(zeroed_scaffolding().as_str()));
    assert_eq!(current.slot_counters.as_ref().map(Dict::len), Some(14));
    assert_eq!(current.song(), None);

    let legacy = EntryRecord::scaffold("Imported 1", Generation::Legacy);
    assert_eq!(legacy.format_version, Some(23));
    assert_eq!(legacy.extra.get("k5"), Some(&Node::Text("Player".to_string())));
}

#[test]
fn zeroed_scaffolding_has_twenty_slots() {
    let value = zeroed_scaffolding();
    assert_eq!(value.split(',').count(), 20);
    assert!(value.split(',').all(|slot| slot == "0"));
}

//! Typed view over one entry-table record.

use serde::Serialize;

use crate::crypto;
use crate::migration::Generation;
use crate::node::{Dict, Node};
use crate::version::{entry_keys, SCAFFOLDING_SLOTS};

/// Number of per-slot counters written into freshly synthesized entries.
const DEFAULT_SLOT_COUNTERS: usize = 14;

/// Song an entry plays: one of the game's built-in tracks or a custom upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SongRef {
    Official(i64),
    Custom(i64),
}

impl SongRef {
    pub fn new(id: i64, is_custom: bool) -> Self {
        if is_custom {
            SongRef::Custom(id)
        } else {
            SongRef::Official(id)
        }
    }

    pub fn id(self) -> i64 {
        match self {
            SongRef::Official(id) | SongRef::Custom(id) => id,
        }
    }

    pub fn is_custom(self) -> bool {
        matches!(self, SongRef::Custom(_))
    }
}

/// One record of the entry table.
///
/// Recognized keys get typed fields. Everything else, including a recognized
/// key whose value has an unexpected type, lives in `extra` untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryRecord {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Encoded payload blob (`k4`).
    pub payload: Option<String>,
    pub official_song: Option<i64>,
    pub custom_song: Option<i64>,
    pub length: Option<i64>,
    pub star_request: Option<i64>,
    pub slot_counters: Option<Dict>,
    pub scaffolding: Option<String>,
    pub format_version: Option<i64>,
    pub extra: Dict,
}

impl EntryRecord {
    pub fn from_dict(dict: Dict) -> Self {
        let mut record = Self::default();
        for (key, value) in dict {
            if let Err(value) = record.absorb(&key, value) {
                record.extra.insert(key, value);
            }
        }
        record
    }

    fn absorb(&mut self, key: &str, value: Node) -> Result<(), Node> {
        match (key, value) {
            (entry_keys::NAME, Node::Text(text)) => self.name = Some(text),
            (entry_keys::DESCRIPTION, Node::Text(text)) => self.description = Some(text),
            (entry_keys::PAYLOAD, Node::Text(text)) => self.payload = Some(text),
            (entry_keys::OFFICIAL_SONG, Node::Integer(id)) => self.official_song = Some(id),
            (entry_keys::CUSTOM_SONG, Node::Integer(id)) => self.custom_song = Some(id),
            (entry_keys::LENGTH, Node::Integer(length)) => self.length = Some(length),
            (entry_keys::STAR_REQUEST, Node::Integer(stars)) => self.star_request = Some(stars),
            (entry_keys::SLOT_COUNTERS, Node::Dict(counters)) => {
                self.slot_counters = Some(counters)
            }
            (entry_keys::SCAFFOLDING, Node::Text(text)) => self.scaffolding = Some(text),
            (entry_keys::FORMAT_VERSION, Node::Integer(version)) => {
                self.format_version = Some(version)
            }
            (_, other) => return Err(other),
        }
        Ok(())
    }

    pub fn to_dict(&self) -> Dict {
        self.clone().into_dict()
    }

    /// Recognized fields first, then the residual keys in their original order.
    pub fn into_dict(self) -> Dict {
        let mut dict = Dict::new();
        let typed: [(&str, Option<Node>); 10] = [
            (entry_keys::NAME, self.name.map(Node::Text)),
            (entry_keys::DESCRIPTION, self.description.map(Node::Text)),
            (entry_keys::PAYLOAD, self.payload.map(Node::Text)),
            (entry_keys::OFFICIAL_SONG, self.official_song.map(Node::Integer)),
            (entry_keys::CUSTOM_SONG, self.custom_song.map(Node::Integer)),
            (entry_keys::LENGTH, self.length.map(Node::Integer)),
            (entry_keys::STAR_REQUEST, self.star_request.map(Node::Integer)),
            (entry_keys::SLOT_COUNTERS, self.slot_counters.map(Node::Dict)),
            (entry_keys::SCAFFOLDING, self.scaffolding.map(Node::Text)),
            (entry_keys::FORMAT_VERSION, self.format_version.map(Node::Integer)),
        ];
        for (key, value) in typed {
            if let Some(value) = value {
                dict.insert(key, value);
            }
        }
        for (key, value) in self.extra {
            dict.insert(key, value);
        }
        dict
    }

    /// Whether the record carries both a name and a payload, the minimum the
    /// game needs to list and load an entry.
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.payload.is_some()
    }

    /// The song reference as stored; a custom song wins over an official one.
    pub fn song(&self) -> Option<SongRef> {
        self.custom_song
            .map(SongRef::Custom)
            .or(self.official_song.map(SongRef::Official))
    }

    /// Assigns a song, clearing the field of the other kind.
    pub fn set_song(&mut self, song: SongRef) {
        match song {
            SongRef::Official(id) => {
                self.official_song = Some(id);
                self.custom_song = None;
            }
            SongRef::Custom(id) => {
                self.custom_song = Some(id);
                self.official_song = None;
            }
        }
        self.extra.remove(entry_keys::OFFICIAL_SONG);
        self.extra.remove(entry_keys::CUSTOM_SONG);
    }

    /// Shallow merge: every key `incoming` carries replaces the stored one,
    /// everything else stays. A single incoming song field still clears the
    /// field of the other kind.
    pub fn overlay(&mut self, incoming: EntryRecord) {
        let incoming_song = match (incoming.official_song, incoming.custom_song) {
            (Some(id), None) => Some(SongRef::Official(id)),
            (None, Some(id)) => Some(SongRef::Custom(id)),
            _ => None,
        };
        let mut merged = std::mem::take(self).into_dict();
        for (key, value) in incoming.into_dict() {
            merged.insert(key, value);
        }
        *self = EntryRecord::from_dict(merged);
        if let Some(song) = incoming_song {
            self.set_song(song);
        }
    }

    /// Applies a batch of edits. The payload is stored blob-encoded.
    pub fn apply(&mut self, changes: FieldChanges) {
        if let Some(song) = changes.song {
            self.set_song(song);
        }
        if let Some(raw) = changes.payload {
            let Ok(encoded) = crypto::encrypt_blob(&raw);
            self.payload = Some(encoded);
        }
        if let Some(name) = changes.name {
            self.name = Some(name);
        }
        if let Some(description) = changes.description {
            self.description = Some(description);
        }
        if let Some(stars) = changes.star_request {
            self.star_request = Some(stars);
        }
        if let Some(length) = changes.length {
            self.length = Some(length);
        }
    }

    /// Full default record for a newly created entry, carrying every field the
    /// current game generation requires.
    pub fn scaffold(name: impl Into<String>, generation: Generation) -> Self {
        let counters: Dict = (0..DEFAULT_SLOT_COUNTERS)
            .map(|slot| (slot.to_string(), 0i64))
            .collect();
        let extra: Dict = [
            (entry_keys::LEVEL_ID, Node::Integer(1)),
            (entry_keys::CREATOR, Node::Text("Player".to_string())),
            (entry_keys::EDITOR_FLAG, Node::Bool(true)),
            (entry_keys::LEVEL_KIND, Node::Integer(2)),
            (entry_keys::LEVEL_TYPE, Node::Integer(1)),
            (entry_keys::OBJECT_COUNT, Node::Integer(0)),
            (entry_keys::ENTRY_KIND, Node::Integer(4)),
            (entry_keys::EDITOR_CAMERA_X, Node::Integer(0)),
            (entry_keys::EDITOR_CAMERA_Y, Node::Integer(0)),
            (entry_keys::EDITOR_ZOOM, Node::Integer(0)),
        ]
        .into_iter()
        .collect();

        Self {
            name: Some(name.into()),
            slot_counters: Some(counters),
            scaffolding: Some(zeroed_scaffolding()),
            format_version: Some(generation.format_version()),
            extra,
            ..Self::default()
        }
    }

    pub fn summary(&self, id: &str) -> EntrySummary {
        let song = self.song().unwrap_or(SongRef::Official(0));
        EntrySummary {
            id: id.to_string(),
            name: self.name.clone().unwrap_or_else(|| "Unnamed".to_string()),
            song_id: song.id(),
            is_custom_song: song.is_custom(),
            length: self.length,
            description: self.description.clone().unwrap_or_default(),
            star_request: self.star_request.unwrap_or(0),
        }
    }
}

/// Comma-separated zero list used for the `k101` scaffolding field.
pub fn zeroed_scaffolding() -> String {
    vec!["0"; SCAFFOLDING_SLOTS].join(",")
}

/// Listing projection of one entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub id: String,
    pub name: String,
    pub song_id: i64,
    pub is_custom_song: bool,
    pub length: Option<i64>,
    pub description: String,
    pub star_request: i64,
}

/// Batch of field edits for [`crate::DocumentStore::write_fields`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldChanges {
    pub song: Option<SongRef>,
    /// Decoded payload text; it is blob-encoded before it is stored.
    pub payload: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub star_request: Option<i64>,
    pub length: Option<i64>,
}

impl FieldChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
#[path = "tests/entry_tests.rs"]
mod tests;

//! Root document of a local-levels save and its entry table.

use tracing::warn;

use crate::entry::EntryRecord;
use crate::error::{SaveError, SaveResult};
use crate::node::{Dict, Node};
use crate::version::{container_keys, ENTRY_ID_PREFIX};

/// Entry table (`LLM_01`): `k_<N>` records in display order.
///
/// Members that are not `k_`-prefixed dicts, such as the `_isArr` flag, are
/// kept in place among the records and written back where they were read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryTable {
    members: Vec<(String, Member)>,
}

#[derive(Clone, Debug, PartialEq)]
enum Member {
    Record(EntryRecord),
    Other(Node),
}

impl EntryTable {
    pub fn from_dict(dict: Dict) -> Self {
        let members = dict
            .into_iter()
            .map(|(key, value)| {
                let member = match value {
                    Node::Dict(record) if key.starts_with(ENTRY_ID_PREFIX) => {
                        Member::Record(EntryRecord::from_dict(record))
                    }
                    other => Member::Other(other),
                };
                (key, member)
            })
            .collect();
        Self { members }
    }

    pub fn to_dict(&self) -> Dict {
        self.members
            .iter()
            .map(|(key, member)| {
                let value = match member {
                    Member::Record(record) => Node::Dict(record.to_dict()),
                    Member::Other(node) => node.clone(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn get(&self, id: &str) -> Option<&EntryRecord> {
        self.iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, record)| record)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut EntryRecord> {
        self.members.iter_mut().find_map(|(existing, member)| match member {
            Member::Record(record) if existing == id => Some(record),
            _ => None,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryRecord)> {
        self.members.iter().filter_map(|(id, member)| match member {
            Member::Record(record) => Some((id.as_str(), record)),
            Member::Other(_) => None,
        })
    }

    /// Inserts a record ahead of all others; imports surface first. Refuses
    /// an id already used by any table member.
    pub fn push_front(&mut self, id: String, record: EntryRecord) -> SaveResult<()> {
        if self.members.iter().any(|(existing, _)| *existing == id) {
            return Err(SaveError::DuplicateEntry { id });
        }
        self.members.insert(0, (id, Member::Record(record)));
        Ok(())
    }

    /// Identifier one past the highest numeric `k_` suffix in the table. When
    /// that would overflow, the lowest unused `k_<N>` is handed out instead.
    pub fn next_id(&self) -> String {
        let numbers: Vec<u64> = self
            .members
            .iter()
            .filter_map(|(id, _)| id_number(id))
            .collect();
        let next = match numbers.iter().max() {
            None => Some(1),
            Some(highest) => highest.checked_add(1),
        };
        let number = next.unwrap_or_else(|| {
            (1u64..)
                .find(|candidate| !numbers.contains(candidate))
                .unwrap_or(u64::MAX)
        });
        format!("{ENTRY_ID_PREFIX}{number}")
    }

    /// First `"<prefix> N"` (N = 1, 2, ...) no record is named yet.
    pub fn unique_name(&self, prefix: &str) -> String {
        (1u64..)
            .map(|counter| format!("{prefix} {counter}"))
            .find(|candidate| {
                !self
                    .iter()
                    .any(|(_, record)| record.name.as_deref() == Some(candidate.as_str()))
            })
            .unwrap_or_else(|| prefix.to_string())
    }
}

/// Numeric suffix of a `k_<digits>` id.
fn id_number(id: &str) -> Option<u64> {
    let digits = id.strip_prefix(ENTRY_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Whole save document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Container {
    pub entries: EntryTable,
    /// `LLM_02` generation marker.
    pub generation_marker: Option<i64>,
    /// Top-level keys the editor does not interpret.
    pub extra: Dict,
}

impl Container {
    /// Whether `root` carries an entry table at all.
    pub fn has_entry_table(root: &Dict) -> bool {
        root.get(container_keys::ENTRY_TABLE)
            .and_then(Node::as_dict)
            .is_some()
    }

    pub fn from_root(mut root: Dict) -> Self {
        let entries = match root.remove(container_keys::ENTRY_TABLE) {
            Some(Node::Dict(table)) => EntryTable::from_dict(table),
            Some(other) => {
                warn!(value = ?other, "entry table is not a dict, replacing it");
                EntryTable::default()
            }
            None => EntryTable::default(),
        };
        let generation_marker = match root.remove(container_keys::GENERATION_MARKER) {
            Some(Node::Integer(marker)) => Some(marker),
            Some(other) => {
                root.insert(container_keys::GENERATION_MARKER, other);
                None
            }
            None => None,
        };
        Self {
            entries,
            generation_marker,
            extra: root,
        }
    }

    pub fn to_root(&self) -> Dict {
        let mut root = Dict::new();
        root.insert(
            container_keys::ENTRY_TABLE,
            Node::Dict(self.entries.to_dict()),
        );
        if let Some(marker) = self.generation_marker {
            root.insert(container_keys::GENERATION_MARKER, Node::Integer(marker));
        }
        for (key, value) in self.extra.iter() {
            root.insert(key, value.clone());
        }
        root
    }
}

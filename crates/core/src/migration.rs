//! Save generations and the legacy-to-current record upgrade.
//!
//! Detection is a cheap textual sniff that runs before any structural parse,
//! because legacy documents do not always parse cleanly as current ones. A
//! current document that carries none of the signals is reported as legacy.

use std::fmt;

use serde::Serialize;

use crate::crypto;
use crate::entry::{zeroed_scaffolding, EntryRecord};
use crate::node::{Dict, Node};
use crate::version::{
    entry_keys, CURRENT_FORMAT_VERSION, CURRENT_HEADER_MARKER, CURRENT_PAYLOAD_MARKER,
    LEGACY_FORMAT_VERSION,
};

/// Structural dialect of a save document or entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Generation {
    /// 1.9-era documents with textual slot counters.
    Legacy,
    /// 2.0+ documents.
    Current,
}

impl Generation {
    /// `k50` / `LLM_02` sentinel for this generation.
    pub fn format_version(self) -> i64 {
        match self {
            Generation::Legacy => LEGACY_FORMAT_VERSION,
            Generation::Current => CURRENT_FORMAT_VERSION,
        }
    }

    /// Generation of a whole container, judged by its header marker only.
    pub fn from_container_text(raw: &str) -> Self {
        if raw.contains(CURRENT_HEADER_MARKER) {
            Generation::Current
        } else {
            Generation::Legacy
        }
    }

    pub fn is_legacy(self) -> bool {
        self == Generation::Legacy
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Legacy => write!(f, "legacy (1.9)"),
            Generation::Current => write!(f, "current (2.0+)"),
        }
    }
}

/// Guesses the generation of an import payload.
///
/// Current if the text carries the current header marker or the
/// current-only `k101` key. Content that is not markup is also treated as a
/// payload blob: Current if its decoded text holds a current-only marker token
/// or a `;` object delimiter.
pub fn detect_generation(content: &str) -> Generation {
    if content.contains(CURRENT_HEADER_MARKER) || content.contains(entry_keys::SCAFFOLDING) {
        return Generation::Current;
    }
    if !content.trim_start().starts_with('<') {
        let Ok(decoded) = crypto::decrypt_blob(content.trim());
        if decoded.contains(CURRENT_PAYLOAD_MARKER) || decoded.contains(';') {
            return Generation::Current;
        }
    }
    Generation::Legacy
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpgradeStep {
    pub step_id: &'static str,
    pub changed: bool,
}

/// Trace of one [`upgrade`] run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpgradeReport {
    pub steps: Vec<UpgradeStep>,
}

impl UpgradeReport {
    pub fn changed(&self) -> bool {
        self.steps.iter().any(|step| step.changed)
    }
}

struct UpgradeRule {
    step_id: &'static str,
    apply: fn(&mut EntryRecord) -> bool,
}

const UPGRADE_RULES: &[UpgradeRule] = &[
    UpgradeRule {
        step_id: "slot_counters_to_integers",
        apply: coerce_slot_counters,
    },
    UpgradeRule {
        step_id: "insert_scaffolding",
        apply: insert_scaffolding,
    },
    UpgradeRule {
        step_id: "format_version_to_current",
        apply: bump_format_version,
    },
];

/// Upgrades a legacy record to the current generation in place.
///
/// Every rule only acts on legacy-shaped data, so running it on a current
/// record changes nothing.
pub fn upgrade(record: &mut EntryRecord) -> UpgradeReport {
    let steps = UPGRADE_RULES
        .iter()
        .map(|rule| UpgradeStep {
            step_id: rule.step_id,
            changed: (rule.apply)(record),
        })
        .collect();
    UpgradeReport { steps }
}

fn coerce_slot_counters(record: &mut EntryRecord) -> bool {
    record
        .slot_counters
        .as_mut()
        .map(coerce_to_integers)
        .unwrap_or(false)
}

fn coerce_to_integers(dict: &mut Dict) -> bool {
    let mut changed = false;
    for (_, value) in dict.iter_mut() {
        match value {
            Node::Dict(child) => changed |= coerce_to_integers(child),
            Node::Integer(_) => {}
            other => {
                *other = Node::Integer(other.coerce_integer());
                changed = true;
            }
        }
    }
    changed
}

fn insert_scaffolding(record: &mut EntryRecord) -> bool {
    if record.scaffolding.is_some() || record.extra.contains_key(entry_keys::SCAFFOLDING) {
        return false;
    }
    record.scaffolding = Some(zeroed_scaffolding());
    true
}

fn bump_format_version(record: &mut EntryRecord) -> bool {
    if record.format_version != Some(LEGACY_FORMAT_VERSION) {
        return false;
    }
    record.format_version = Some(CURRENT_FORMAT_VERSION);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_marker_decides_container_generation() {
        assert_eq!(
            Generation::from_container_text("<plist version=\"1.0\" gjver=\"2.0\">"),
            Generation::Current
        );
        assert_eq!(
            Generation::from_container_text("<plist version=\"1.0\"><dict><k>k101</k>"),
            Generation::Legacy
        );
    }

    #[test]
    fn nested_counter_dicts_are_coerced() {
        let inner: Dict = [("a", Node::Text("3".to_string()))].into_iter().collect();
        let mut counters: Dict = [
            ("0", Node::Text("12".to_string())),
            ("1", Node::Dict(inner)),
            ("2", Node::Bool(true)),
        ]
        .into_iter()
        .collect();
        assert!(coerce_to_integers(&mut counters));
        assert_eq!(counters.get("0"), Some(&Node::Integer(12)));
        assert_eq!(
            counters
                .get("1")
                .and_then(Node::as_dict)
                .and_then(|dict| dict.get("a")),
            Some(&Node::Integer(3))
        );
        assert_eq!(counters.get("2"), Some(&Node::Integer(0)));
        assert!(!coerce_to_integers(&mut counters));
    }

    #[test]
    fn mistyped_scaffolding_is_left_alone() {
        let mut record = EntryRecord::default();
        record.extra.insert(entry_keys::SCAFFOLDING, Node::Integer(0));
        assert!(!insert_scaffolding(&mut record));
        assert_eq!(record.scaffolding, None);
    }
}

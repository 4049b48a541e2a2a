//! Format constants for the local-levels save container.
//!
//! Key names are opaque identifiers used by the game; they are kept verbatim
//! so documents written by the game and by this crate stay interchangeable.

/// Single-byte key of the XOR obfuscation layer around whole containers.
pub const CONTAINER_XOR_KEY: u8 = 11;

/// Default file name of the local-levels container inside an instance directory.
pub const SAVE_FILE_NAME: &str = "CCLocalLevels.dat";

/// Header attribute written by current-generation game builds.
pub const CURRENT_HEADER_MARKER: &str = "gjver=\"2.0\"";

/// `k50` value carried by legacy-generation records.
pub const LEGACY_FORMAT_VERSION: i64 = 23;

/// `k50` value carried by current-generation records.
pub const CURRENT_FORMAT_VERSION: i64 = 45;

/// Leading characters of a base64-encoded gzip stream.
pub const ENCODED_BLOB_PREFIX: &str = "H4sIA";

/// Number of comma-separated slots in the `k101` scaffolding default.
pub const SCAFFOLDING_SLOTS: usize = 20;

/// Prefix shared by every entry-table identifier (`k_1`, `k_2`, ...).
pub const ENTRY_ID_PREFIX: &str = "k_";

/// Target identifier that asks an import to create a fresh entry.
pub const NEW_ENTRY_TARGET: &str = "new";

/// Container-level keys.
pub mod container_keys {
    pub const ENTRY_TABLE: &str = "LLM_01";
    pub const GENERATION_MARKER: &str = "LLM_02";
}

/// Per-entry keys.
pub mod entry_keys {
    pub const LEVEL_ID: &str = "k1";
    pub const NAME: &str = "k2";
    pub const DESCRIPTION: &str = "k3";
    pub const PAYLOAD: &str = "k4";
    pub const CREATOR: &str = "k5";
    pub const OFFICIAL_SONG: &str = "k8";
    pub const EDITOR_FLAG: &str = "k13";
    pub const LEVEL_TYPE: &str = "k16";
    pub const LEVEL_KIND: &str = "k21";
    pub const LENGTH: &str = "k23";
    pub const CUSTOM_SONG: &str = "k45";
    pub const FORMAT_VERSION: &str = "k50";
    pub const STAR_REQUEST: &str = "k66";
    pub const OBJECT_COUNT: &str = "k80";
    pub const SCAFFOLDING: &str = "k101";
    pub const ENTRY_KIND: &str = "kCEK";
    pub const EDITOR_CAMERA_X: &str = "kI1";
    pub const EDITOR_CAMERA_Y: &str = "kI2";
    pub const EDITOR_ZOOM: &str = "kI3";
    pub const SLOT_COUNTERS: &str = "kI6";
}

/// Marker token that only appears inside current-generation level payloads.
pub const CURRENT_PAYLOAD_MARKER: &str = "kA14";

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SaveError, SaveResult};
use crate::markup::DEFAULT_MAX_DEPTH;
use crate::version::SAVE_FILE_NAME;

/// Editor settings, usually read from a small TOML file next to the instances.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// File name of the container inside an instance directory.
    pub save_file_name: String,
    /// Deepest dict nesting accepted when parsing a document.
    pub max_markup_depth: usize,
    /// Base of the display name given to imported entries.
    pub import_name_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            save_file_name: SAVE_FILE_NAME.to_string(),
            max_markup_depth: DEFAULT_MAX_DEPTH,
            import_name_prefix: "Imported".to_string(),
        }
    }
}

impl StoreConfig {
    /// Loads settings from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> SaveResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|err| SaveError::io(path, err))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> SaveResult<Self> {
        Ok(toml::from_str(raw)?)
    }
}

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

pub type SaveResult<T> = Result<T, SaveError>;

#[derive(Debug, Error, Diagnostic)]
pub enum SaveError {
    #[error("malformed markup: {reason}")]
    #[diagnostic(code("gdsave.malformed_markup"))]
    MalformedMarkup { reason: String },

    #[error("save data could not be decoded: {reason}")]
    #[diagnostic(code("gdsave.decode"))]
    Decode { reason: String },

    #[error("save data could not be encoded: {reason}")]
    #[diagnostic(code("gdsave.encode"))]
    Encode { reason: String },

    #[error("save file {} is unreadable or corrupt", .path.display())]
    #[diagnostic(
        code("gdsave.corrupt_save"),
        help("restore the file from a backup or let the game regenerate it")
    )]
    CorruptSave { path: PathBuf },

    #[error("no editor session is open")]
    #[diagnostic(code("gdsave.no_session"), help("open an instance before editing"))]
    NoSession,

    #[error("entry '{id}' not found")]
    #[diagnostic(code("gdsave.entry_not_found"))]
    EntryNotFound { id: String },

    #[error("entry id '{id}' is already in use")]
    #[diagnostic(code("gdsave.duplicate_entry"))]
    DuplicateEntry { id: String },

    #[error("import payload does not contain a recognizable entry")]
    #[diagnostic(
        code("gdsave.no_valid_entry"),
        help("a packaged entry needs both a name (k2) and a payload (k4)")
    )]
    NoValidEntry,

    #[error("cannot import current-generation content into legacy instance '{instance}'")]
    #[diagnostic(code("gdsave.incompatible_generation"))]
    IncompatibleGeneration { instance: String },

    #[error("io failure at {}: {source}", .path.display())]
    #[diagnostic(code("gdsave.io"))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    #[diagnostic(code("gdsave.config"))]
    Config(#[from] toml::de::Error),
}

impl SaveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMarkup {
            reason: reason.into(),
        }
    }
}

mod config;
mod container;
mod crypto;
mod entry;
mod error;
mod markup;
mod migration;
mod node;
mod store;
pub mod version;

pub use config::StoreConfig;
pub use container::{Container, EntryTable};
pub use crypto::{
    base64_url_decode, base64_url_encode, compress, decompress, decrypt_blob, decrypt_container,
    encrypt_blob, encrypt_container, is_encoded_blob, xor_transform,
};
pub use entry::{zeroed_scaffolding, EntryRecord, EntrySummary, FieldChanges, SongRef};
pub use error::{SaveError, SaveResult};
pub use markup::{
    build, build_for, build_fragment, build_pretty, build_pretty_for, parse, MarkupParser,
    DEFAULT_MAX_DEPTH,
};
pub use migration::{detect_generation, upgrade, Generation, UpgradeReport, UpgradeStep};
pub use node::{lenient_int, Dict, Node};
pub use store::{DocumentStore, ExportFormat, ImportTarget, Session};

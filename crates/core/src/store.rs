//! Editing session over one instance's local-levels container.
//!
//! The store owns at most one [`Session`]. Every mutator either applies fully
//! or leaves the session untouched, and marks the session dirty on success.
//! Opening another instance drops the current session without saving it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::config::StoreConfig;
use crate::container::Container;
use crate::crypto;
use crate::entry::{EntryRecord, EntrySummary, FieldChanges, SongRef};
use crate::error::{SaveError, SaveResult};
use crate::markup::{self, MarkupParser};
use crate::migration::{self, Generation};
use crate::node::{lenient_int, Dict, Node};
use crate::version::{entry_keys, NEW_ENTRY_TARGET};

/// Where an import lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportTarget {
    /// A fresh entry at the top of the table.
    New,
    /// Merge into an existing entry.
    Existing(String),
}

impl From<&str> for ImportTarget {
    fn from(value: &str) -> Self {
        if value == NEW_ENTRY_TARGET {
            ImportTarget::New
        } else {
            ImportTarget::Existing(value.to_string())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Decoded payload text.
    Raw,
    /// Minimal single-entry markup document.
    Packaged,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Raw => "txt",
            ExportFormat::Packaged => "gmd",
        }
    }
}

/// One open instance: the decoded container plus bookkeeping.
#[derive(Debug)]
pub struct Session {
    instance_id: String,
    path: PathBuf,
    container: Container,
    dirty: bool,
    generation: Generation,
}

impl Session {
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Save file the session was loaded from or last persisted to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    fn record_mut(&mut self, id: &str) -> SaveResult<&mut EntryRecord> {
        self.container
            .entries
            .get_mut(id)
            .ok_or_else(|| entry_not_found(id))
    }
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    config: StoreConfig,
    session: Option<Session>,
}

impl DocumentStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Drops the session without saving and hands it back.
    pub fn close(&mut self) -> Option<Session> {
        self.session.take()
    }

    pub fn is_dirty(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_dirty)
    }

    pub fn generation(&self) -> SaveResult<Generation> {
        Ok(self.active()?.generation)
    }

    pub fn instance_id(&self) -> SaveResult<&str> {
        Ok(&self.active()?.instance_id)
    }

    /// Path of the container file for `instance_id` under `root_dir`.
    pub fn save_path(&self, root_dir: &Path, instance_id: &str) -> PathBuf {
        root_dir.join(instance_id).join(&self.config.save_file_name)
    }

    #[instrument(skip(self, root_dir), fields(root = %root_dir.display()))]
    pub fn open(&mut self, root_dir: &Path, instance_id: &str) -> SaveResult<()> {
        let path = self.save_path(root_dir, instance_id);
        let bytes = fs::read(&path).map_err(|err| SaveError::io(&path, err))?;
        let text = match crypto::decrypt_container(&bytes) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => return Err(SaveError::CorruptSave { path }),
            Err(err) => {
                warn!(error = %err, "container could not be decoded");
                return Err(SaveError::CorruptSave { path });
            }
        };

        let generation = Generation::from_container_text(&text);
        let root = self.parser().parse(&text)?;
        let has_table = Container::has_entry_table(&root);
        let mut container = Container::from_root(root);
        if !has_table {
            debug!("container has no entry table, starting an empty one");
            container.generation_marker = Some(generation.format_version());
        }

        info!(entries = container.entries.len(), %generation, "session opened");
        let replaced = self.session.replace(Session {
            instance_id: instance_id.to_string(),
            path,
            container,
            dirty: false,
            generation,
        });
        if let Some(previous) = replaced.filter(Session::is_dirty) {
            warn!(
                instance = %previous.instance_id,
                "unsaved edits of the previous session were discarded"
            );
        }
        Ok(())
    }

    #[instrument(skip(self, root_dir), fields(root = %root_dir.display()))]
    pub fn persist(&mut self, root_dir: &Path) -> SaveResult<()> {
        let path = {
            let session = self.active()?;
            self.save_path(root_dir, &session.instance_id)
        };
        let session = active_mut(&mut self.session)?;
        let text = markup::build_for(&session.container.to_root(), session.generation);
        let bytes = crypto::encrypt_container(&text)?;
        write_atomically(&path, &bytes)?;
        session.path = path;
        session.dirty = false;
        info!(bytes = bytes.len(), "session persisted");
        Ok(())
    }

    pub fn list_entries(&self) -> SaveResult<Vec<EntrySummary>> {
        Ok(self
            .active()?
            .container
            .entries
            .iter()
            .map(|(id, record)| record.summary(id))
            .collect())
    }

    pub fn entry(&self, id: &str) -> SaveResult<&EntryRecord> {
        self.active()?
            .container
            .entries
            .get(id)
            .ok_or_else(|| entry_not_found(id))
    }

    /// Decoded payload of an entry.
    pub fn read_payload(&self, id: &str) -> SaveResult<String> {
        let record = self.entry(id)?;
        let Ok(text) = crypto::decrypt_blob(record.payload.as_deref().unwrap_or_default());
        Ok(text)
    }

    pub fn write_fields(&mut self, id: &str, changes: FieldChanges) -> SaveResult<()> {
        self.edit(id, |record| record.apply(changes))
    }

    pub fn rename(&mut self, id: &str, name: &str) -> SaveResult<()> {
        self.edit(id, |record| record.name = Some(name.to_string()))
    }

    pub fn set_description(&mut self, id: &str, description: &str) -> SaveResult<()> {
        self.edit(id, |record| record.description = Some(description.to_string()))
    }

    /// Stores the star request parsed leniently; unparseable input stores 0.
    pub fn set_star_request(&mut self, id: &str, stars: &str) -> SaveResult<()> {
        let stars = lenient_int(stars);
        self.edit(id, |record| record.star_request = Some(stars))
    }

    pub fn set_song(&mut self, id: &str, song: SongRef) -> SaveResult<()> {
        self.edit(id, |record| record.set_song(song))
    }

    /// Imports a packaged entry document or a raw payload.
    ///
    /// Returns the identifier of the created or updated entry.
    #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
    pub fn import_external(
        &mut self,
        payload: &str,
        target: impl Into<ImportTarget> + std::fmt::Debug,
    ) -> SaveResult<String> {
        let parser = self.parser();
        let session = active_mut(&mut self.session)?;
        let content = payload.trim();

        let source = migration::detect_generation(content);
        if session.generation.is_legacy() && source == Generation::Current {
            return Err(SaveError::IncompatibleGeneration {
                instance: session.instance_id.clone(),
            });
        }

        let mut incoming = extract_record(content, parser)?;
        if session.generation == Generation::Current && source.is_legacy() {
            let report = migration::upgrade(&mut incoming);
            debug!(changed = report.changed(), "upgraded legacy entry");
        }

        let entries = &mut session.container.entries;
        let id = match target.into() {
            ImportTarget::New => {
                let name = entries.unique_name(&self.config.import_name_prefix);
                let id = entries.next_id();
                let mut record = EntryRecord::scaffold(name, session.generation);
                record.overlay(incoming);
                entries.push_front(id.clone(), record)?;
                id
            }
            ImportTarget::Existing(id) => {
                entries
                    .get_mut(&id)
                    .ok_or_else(|| entry_not_found(&id))?
                    .overlay(incoming);
                id
            }
        };
        session.dirty = true;
        info!(%id, %source, "entry imported");
        Ok(id)
    }

    pub fn export_entry(&self, id: &str, format: ExportFormat) -> SaveResult<String> {
        match format {
            ExportFormat::Raw => self.read_payload(id),
            ExportFormat::Packaged => {
                let generation = self.active()?.generation;
                let record = self.entry(id)?;
                let packaged: Dict = [
                    (entry_keys::NAME, Node::Text(display_name(record))),
                    (
                        entry_keys::PAYLOAD,
                        Node::Text(record.payload.clone().unwrap_or_default()),
                    ),
                    (entry_keys::LEVEL_ID, Node::Integer(1)),
                    (
                        entry_keys::FORMAT_VERSION,
                        Node::Integer(generation.format_version()),
                    ),
                    (entry_keys::ENTRY_KIND, Node::Integer(4)),
                ]
                .into_iter()
                .collect();
                Ok(markup::build_fragment(&packaged))
            }
        }
    }

    /// Suggested file name for an export, derived from the entry name.
    pub fn export_file_name(&self, id: &str, format: ExportFormat) -> SaveResult<String> {
        let name = display_name(self.entry(id)?).replace(['/', '\\'], "_");
        Ok(format!("{name}.{}", format.extension()))
    }

    /// Indented markup of the whole container, for a raw document editor.
    pub fn document_markup(&self) -> SaveResult<String> {
        let session = self.active()?;
        Ok(markup::build_pretty_for(
            &session.container.to_root(),
            session.generation,
        ))
    }

    /// Replaces the container with edited markup. Malformed markup leaves the
    /// session unchanged.
    pub fn replace_document(&mut self, text: &str) -> SaveResult<()> {
        let parser = self.parser();
        let session = active_mut(&mut self.session)?;
        let root = parser.parse(text)?;
        let has_table = Container::has_entry_table(&root);
        let mut container = Container::from_root(root);
        if !has_table {
            container.generation_marker = Some(session.generation.format_version());
        }
        session.container = container;
        session.dirty = true;
        Ok(())
    }

    fn parser(&self) -> MarkupParser {
        MarkupParser::with_max_depth(self.config.max_markup_depth)
    }

    fn active(&self) -> SaveResult<&Session> {
        self.session.as_ref().ok_or(SaveError::NoSession)
    }

    fn edit(&mut self, id: &str, change: impl FnOnce(&mut EntryRecord)) -> SaveResult<()> {
        let session = active_mut(&mut self.session)?;
        change(session.record_mut(id)?);
        session.dirty = true;
        Ok(())
    }
}

fn active_mut(session: &mut Option<Session>) -> SaveResult<&mut Session> {
    session.as_mut().ok_or(SaveError::NoSession)
}

fn entry_not_found(id: &str) -> SaveError {
    SaveError::EntryNotFound { id: id.to_string() }
}

fn display_name(record: &EntryRecord) -> String {
    record.name.clone().unwrap_or_else(|| "Unnamed".to_string())
}

/// Locates the entry carried by an import payload.
fn extract_record(content: &str, parser: MarkupParser) -> SaveResult<EntryRecord> {
    if content.starts_with('<') {
        let root = parser.parse(content).map_err(|err| {
            debug!(error = %err, "import markup has no usable dict");
            SaveError::NoValidEntry
        })?;
        let found = if carries_entry(&root) {
            Some(root)
        } else {
            root.into_iter()
                .filter_map(|(_, value)| value.into_dict())
                .find(carries_entry)
        };
        return found
            .map(EntryRecord::from_dict)
            .ok_or(SaveError::NoValidEntry);
    }

    if content.is_empty() {
        return Err(SaveError::NoValidEntry);
    }
    let payload = if crypto::is_encoded_blob(content) {
        content.to_string()
    } else {
        let Ok(encoded) = crypto::encrypt_blob(content);
        encoded
    };
    Ok(EntryRecord {
        payload: Some(payload),
        ..EntryRecord::default()
    })
}

/// A dict holds an entry when it has a name and a non-empty payload.
fn carries_entry(dict: &Dict) -> bool {
    let has_name = dict
        .get(entry_keys::NAME)
        .and_then(Node::as_text)
        .is_some_and(|name| !name.is_empty());
    let has_payload = dict
        .get(entry_keys::PAYLOAD)
        .and_then(Node::as_text)
        .is_some_and(|payload| !payload.is_empty());
    has_name && has_payload
}

/// Writes through a sibling temp file so a failed write never truncates the
/// existing save.
fn write_atomically(path: &Path, bytes: &[u8]) -> SaveResult<()> {
    let parent = path.parent().ok_or_else(|| {
        SaveError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "target path has no parent"),
        )
    })?;
    fs::create_dir_all(parent).map_err(|err| SaveError::io(parent, err))?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes).map_err(|err| SaveError::io(&tmp_path, err))?;
    if path.exists() {
        fs::remove_file(path).map_err(|err| SaveError::io(path, err))?;
    }
    fs::rename(&tmp_path, path).map_err(|err| SaveError::io(path, err))?;
    Ok(())
}

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use gdsave_core::{
    build_for, encrypt_blob, encrypt_container, Dict, DocumentStore, Generation, Node,
    StoreConfig,
};

pub const INSTANCE: &str = "main";

/// Encoded payload blob for `text`.
pub fn blob(text: &str) -> String {
    let Ok(encoded) = encrypt_blob(text);
    encoded
}

/// Minimal entry record with a name and an encoded payload.
pub fn record(name: &str, payload: &str) -> Dict {
    [
        ("k2", Node::Text(name.to_string())),
        ("k4", Node::Text(blob(payload))),
    ]
    .into_iter()
    .collect()
}

/// Container root with `_isArr` and the given records in order.
pub fn container_root(generation: Generation, records: Vec<(&str, Dict)>) -> Dict {
    let mut table = Dict::new();
    table.insert("_isArr", Node::Bool(true));
    for (id, record) in records {
        table.insert(id, Node::Dict(record));
    }
    [
        ("LLM_01", Node::Dict(table)),
        ("LLM_02", Node::Integer(generation.format_version())),
    ]
    .into_iter()
    .collect()
}

/// Writes `root` as an encrypted container for [`INSTANCE`] under `dir`.
pub fn write_container(dir: &Path, root: &Dict, generation: Generation) {
    write_markup(dir, &build_for(root, generation));
}

pub fn write_markup(dir: &Path, markup: &str) {
    let instance_dir = dir.join(INSTANCE);
    fs::create_dir_all(&instance_dir).expect("create instance dir");
    let bytes = encrypt_container(markup).expect("encrypt container");
    fs::write(instance_dir.join("CCLocalLevels.dat"), bytes).expect("write container");
}

/// Store with an open session over a freshly written container.
pub fn open_store(dir: &Path, generation: Generation, records: Vec<(&str, Dict)>) -> DocumentStore {
    write_container(dir, &container_root(generation, records), generation);
    let mut store = DocumentStore::new(StoreConfig::default());
    store.open(dir, INSTANCE).expect("open session");
    store
}

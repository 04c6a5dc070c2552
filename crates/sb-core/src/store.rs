//! Persistence gateway.
//!
//! A document is stored as one JSON record under a single key. Reading is
//! forgiving: entries are decoded one at a time, missing optional fields get
//! defaults, and anything that cannot be salvaged is skipped with a warning.
//! Loading never fails; the bundled example story stands in for a missing or
//! corrupt record.

use crate::config::BoardConfig;
use crate::id::{BoxId, ConnId};
use crate::model::{Connection, Document, StoryBox};
use log::{info, warn};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// The example story shown on first launch.
const DEFAULT_STORY: &str = include_str!("default_story.json");

// ─── Errors ──────────────────────────────────────────────────────────────

/// Failure reading or writing the durable store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage write rejected: {0}")]
    WriteRejected(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize storyboard: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why an imported file was refused. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to parse file: {0}")]
    Syntax(String),
    #[error("Invalid storyboard file: missing or non-array `{0}`")]
    MissingArray(&'static str),
}

// ─── Stores ──────────────────────────────────────────────────────────────

/// A durable key-value store holding whole-document snapshots.
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct MemoryRecords {
    records: HashMap<String, String>,
    fail_writes: bool,
    writes: usize,
}

/// In-process store. Clones share the same records, so a test can keep a
/// handle after giving one to a [`Gateway`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryRecords>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `value` under `key`.
    pub fn with_record(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .inner
            .borrow_mut()
            .records
            .insert(key.to_string(), value.to_string());
        store
    }

    /// Make every subsequent write fail (quota exceeded, storage disabled…).
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    pub fn record(&self, key: &str) -> Option<String> {
        self.inner.borrow().records.get(key).cloned()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.record(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(StoreError::WriteRejected("memory store is read-only".into()));
        }
        inner.records.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Write-then-rename so a crash mid-write never truncates the record.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

// ─── Gateway ─────────────────────────────────────────────────────────────

/// Reads and writes whole documents through a [`Store`].
pub struct Gateway {
    store: Box<dyn Store>,
    config: BoardConfig,
}

impl Gateway {
    pub fn new(store: impl Store + 'static, config: BoardConfig) -> Self {
        Self {
            store: Box::new(store),
            config,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Read the stored document, falling back to the bundled example story.
    pub fn load(&self) -> Document {
        let key = &self.config.storage_key;
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("no saved storyboard under {key:?}, loading the example story");
                return default_document(&self.config);
            }
            Err(e) => {
                warn!("could not read saved storyboard ({e}), loading the example story");
                return default_document(&self.config);
            }
        };

        match parse_document(&raw, &self.config.untitled_name, &self.config) {
            Ok(doc) => {
                info!(
                    "loaded {:?}: {} boxes, {} connections",
                    doc.name(),
                    doc.box_count(),
                    doc.connection_count()
                );
                doc
            }
            Err(e) => {
                warn!("failed to parse saved storyboard ({e}), using the example story");
                default_document(&self.config)
            }
        }
    }

    /// Write a full snapshot of `doc`.
    pub fn save(&mut self, doc: &Document) -> Result<(), StoreError> {
        let json = snapshot(doc)?;
        self.write_snapshot(&json)
    }

    /// Write an already-serialized snapshot.
    pub fn write_snapshot(&mut self, json: &str) -> Result<(), StoreError> {
        self.store.set(&self.config.storage_key, json)
    }
}

/// Compact JSON snapshot for the durable store.
pub fn snapshot(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string(doc)
}

/// The bundled example story.
pub fn default_document(config: &BoardConfig) -> Document {
    parse_document(DEFAULT_STORY, &config.untitled_name, config).unwrap_or_else(|e| {
        warn!("bundled example story is invalid ({e}), starting empty");
        Document::new(config.untitled_name.clone())
    })
}

// ─── Export / import ─────────────────────────────────────────────────────

/// A portable, pretty-printed document file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

/// `<name>.json`, or the fallback stem when the document is unnamed.
pub fn export_file_name(doc: &Document, config: &BoardConfig) -> String {
    let stem = if doc.name().is_empty() {
        config.export_fallback_name.as_str()
    } else {
        doc.name()
    };
    format!("{}.json", stem.replace(['/', '\\'], "-"))
}

pub fn export_document(doc: &Document, config: &BoardConfig) -> Result<ExportFile, serde_json::Error> {
    Ok(ExportFile {
        file_name: export_file_name(doc, config),
        contents: serde_json::to_string_pretty(doc)?,
    })
}

/// Parse an imported file. Nothing is mutated; the caller swaps the result in.
/// An empty name is replaced by `config.imported_name`.
pub fn import_document(contents: &str, config: &BoardConfig) -> Result<Document, ImportError> {
    let mut doc = parse_document(contents, &config.imported_name, config)?;
    if doc.name().is_empty() {
        doc.set_name(config.imported_name.as_str());
    }
    Ok(doc)
}

/// Parse JSON text into a document, requiring array-typed `boxes` and
/// `connections`. `fallback_name` is used when `name` is missing; an empty
/// name is kept.
pub fn parse_document(
    text: &str,
    fallback_name: &str,
    config: &BoardConfig,
) -> Result<Document, ImportError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ImportError::Syntax(e.to_string()))?;
    decode_document(value, fallback_name, config)
}

/// Validate and decode a parsed JSON value.
pub fn decode_document(
    value: Value,
    fallback_name: &str,
    config: &BoardConfig,
) -> Result<Document, ImportError> {
    let mut root = match value {
        Value::Object(root) => root,
        _ => return Err(ImportError::MissingArray("boxes")),
    };
    let boxes = take_array(&mut root, "boxes")?;
    let connections = take_array(&mut root, "connections")?;

    let name = match root.remove("name") {
        Some(Value::String(name)) => name,
        _ => fallback_name.to_string(),
    };

    let reserved = referenced_box_ids(&boxes, &connections);
    let mut doc = Document::new(name);
    decode_boxes(&mut doc, boxes, &reserved, config);
    decode_connections(&mut doc, connections, config);
    Ok(doc)
}

fn take_array(root: &mut Map<String, Value>, field: &'static str) -> Result<Vec<Value>, ImportError> {
    match root.remove(field) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(ImportError::MissingArray(field)),
    }
}

/// Insert `value` under `key` when the key is absent or null.
fn default_field(obj: &mut Map<String, Value>, key: &str, value: impl Into<Value>) {
    if obj.get(key).is_none_or(Value::is_null) {
        obj.insert(key.to_string(), value.into());
    }
}

/// Every box id named anywhere in the file, as a box id or a connection
/// endpoint. Generated ids avoid all of them.
fn referenced_box_ids(boxes: &[Value], connections: &[Value]) -> HashSet<BoxId> {
    let box_ids = boxes.iter().filter_map(|b| b.get("id"));
    let endpoints = connections
        .iter()
        .flat_map(|c| [c.get("fromBox"), c.get("toBox")])
        .flatten();
    box_ids
        .chain(endpoints)
        .filter_map(Value::as_str)
        .map(BoxId::intern)
        .collect()
}

fn decode_boxes(
    doc: &mut Document,
    entries: Vec<Value>,
    reserved: &HashSet<BoxId>,
    config: &BoardConfig,
) {
    let taken = |doc: &Document, id: BoxId| doc.contains_box(id) || reserved.contains(&id);
    for (i, entry) in entries.into_iter().enumerate() {
        let Value::Object(mut obj) = entry else {
            warn!("skipping box #{i}: not an object");
            continue;
        };
        if obj.get("id").is_none_or(Value::is_null) {
            let id = BoxId::generate(|id| taken(doc, id));
            obj.insert("id".into(), id.as_str().into());
        }
        default_field(&mut obj, "x", 0.0);
        default_field(&mut obj, "y", 0.0);
        default_field(&mut obj, "width", config.default_width);
        default_field(&mut obj, "height", config.default_height);
        default_field(&mut obj, "title", "");
        default_field(&mut obj, "text", "");
        default_field(&mut obj, "borderColor", config.default_border_color.as_str());

        let mut story_box: StoryBox = match serde_json::from_value(Value::Object(obj)) {
            Ok(b) => b,
            Err(e) => {
                warn!("skipping box #{i}: {e}");
                continue;
            }
        };
        if doc.contains_box(story_box.id) {
            let fresh = BoxId::generate(|id| taken(doc, id));
            warn!("box #{i} reuses id {}, renamed to {fresh}", story_box.id);
            story_box.id = fresh;
        }
        doc.insert_box(story_box);
    }
}

fn decode_connections(doc: &mut Document, entries: Vec<Value>, config: &BoardConfig) {
    for (i, entry) in entries.into_iter().enumerate() {
        let Value::Object(mut obj) = entry else {
            warn!("skipping connection #{i}: not an object");
            continue;
        };
        if obj.get("id").is_none_or(Value::is_null) {
            let id = ConnId::generate(|id| doc.find_connection(id).is_some());
            obj.insert("id".into(), id.as_str().into());
        }
        default_field(&mut obj, "color", config.default_connection_color.as_str());
        default_field(&mut obj, "style", "solid");

        let mut conn: Connection = match serde_json::from_value(Value::Object(obj)) {
            Ok(c) => c,
            Err(e) => {
                warn!("skipping connection #{i}: {e}");
                continue;
            }
        };
        if doc.find_connection(conn.id).is_some() {
            conn.id = ConnId::generate(|id| doc.find_connection(id).is_some());
        }
        if !doc.contains_box(conn.from_box) || !doc.contains_box(conn.to_box) {
            log::debug!("connection {} points at a missing box", conn.id);
        }
        if let Err(reason) = doc.insert_connection(conn) {
            warn!("dropping connection #{i}: {reason}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoxGeometry, ConnectorStyle};
    use pretty_assertions::assert_eq;

    fn cfg() -> BoardConfig {
        BoardConfig::default()
    }

    #[test]
    fn empty_store_loads_example_story() {
        let gateway = Gateway::new(MemoryStore::new(), cfg());
        let doc = gateway.load();
        assert_eq!(doc.name(), "Story title");
        assert_eq!(doc.box_count(), 6);
        assert_eq!(doc.connection_count(), 8);
    }

    #[test]
    fn corrupt_store_loads_example_story() {
        for raw in ["", "{not json", r#"{"boxes": 3, "connections": []}"#, "[]"] {
            let store = MemoryStore::with_record("storyboard-state", raw);
            let doc = Gateway::new(store, cfg()).load();
            assert_eq!(doc.box_count(), 6, "fallback for {raw:?}");
        }
    }

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let mut gateway = Gateway::new(store.clone(), cfg());
        let mut doc = Document::new("Saved");
        let a = doc.create_box(BoxGeometry::new(10.0, 20.0, 200.0, 150.0), &cfg());
        let b = doc.create_box(BoxGeometry::new(300.0, 20.0, 200.0, 150.0), &cfg());
        doc.create_connection(a, b, &cfg()).unwrap();

        gateway.save(&doc).unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(gateway.load(), doc);
    }

    #[test]
    fn cleared_name_survives_reload() {
        let store = MemoryStore::new();
        let mut gateway = Gateway::new(store, cfg());
        gateway.save(&Document::new("")).unwrap();
        let back = gateway.load();
        assert_eq!(back.name(), "");
        assert_eq!(back.box_count(), 0);
    }

    #[test]
    fn generated_box_ids_skip_ids_named_later_in_the_file() {
        // The next few generated ids, spelled out explicitly after an id-less box.
        let upcoming = BoxId::generate(|_| false);
        let n: u64 = upcoming.as_str()["box-".len()..].parse().unwrap();
        let saved: Vec<String> = (n + 1..n + 33).map(|k| format!("box-{k}")).collect();
        let boxes: Vec<Value> = std::iter::once(serde_json::json!({ "title": "no id" }))
            .chain(saved.iter().map(|id| serde_json::json!({ "id": id, "title": id })))
            .collect();
        let file = serde_json::json!({
            "boxes": boxes,
            "connections": [{ "id": "c", "fromBox": saved[0], "toBox": saved[1] }],
        });

        let doc = import_document(&file.to_string(), &cfg()).unwrap();
        assert_eq!(doc.box_count(), 33);
        for id in &saved {
            assert_eq!(doc.find_box(BoxId::intern(id)).unwrap().title, *id);
        }
        let conn = doc.find_connection(ConnId::intern("c")).unwrap();
        assert_eq!(doc.find_box(conn.from_box).unwrap().title, saved[0]);
    }

    #[test]
    fn failing_store_reports_error() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let mut gateway = Gateway::new(store.clone(), cfg());
        assert!(gateway.save(&Document::new("x")).is_err());
        assert!(store.record("storyboard-state").is_none());
    }

    #[test]
    fn import_rejects_non_array_boxes() {
        let err = import_document(r#"{"boxes": "not-an-array", "connections": []}"#, &cfg())
            .unwrap_err();
        assert_eq!(err, ImportError::MissingArray("boxes"));
        assert!(err.to_string().contains("boxes"));
    }

    #[test]
    fn import_rejects_missing_connections() {
        let err = import_document(r#"{"boxes": []}"#, &cfg()).unwrap_err();
        assert_eq!(err, ImportError::MissingArray("connections"));
    }

    #[test]
    fn import_reports_syntax_errors() {
        let err = import_document("{\"boxes\": [", &cfg()).unwrap_err();
        assert!(matches!(err, ImportError::Syntax(_)));
        assert!(err.to_string().starts_with("Failed to parse file"));
    }

    #[test]
    fn import_fills_missing_fields() {
        let doc = import_document(
            r#"{
                "boxes": [
                    {"id": "a", "x": 5, "y": 6},
                    {"x": 400, "title": null},
                    "garbage",
                    {"id": "bad", "x": "left"}
                ],
                "connections": [
                    {"fromBox": "a", "toBox": "ghost", "style": "zigzag"},
                    {"id": "c2", "toBox": "a"}
                ]
            }"#,
            &cfg(),
        )
        .unwrap();

        assert_eq!(doc.name(), "Imported Storyboard");
        assert_eq!(doc.box_count(), 2);
        let a = doc.find_box(BoxId::intern("a")).unwrap();
        assert_eq!((a.width, a.height), (200.0, 150.0));
        assert_eq!(a.title, "");
        assert_eq!(a.border_color, "#3498db");

        assert_eq!(doc.connection_count(), 1);
        let conn = doc.connections().next().unwrap();
        assert_eq!(conn.style, ConnectorStyle::Solid);
        assert_eq!(conn.color, "#2c3e50");
        assert_eq!(conn.to_box, BoxId::intern("ghost"));
    }

    #[test]
    fn import_enforces_connection_invariants() {
        let doc = import_document(
            r#"{
                "name": "Dupes",
                "boxes": [{"id": "p"}, {"id": "q"}, {"id": "p", "x": 900}],
                "connections": [
                    {"id": "c1", "fromBox": "p", "toBox": "q"},
                    {"id": "c2", "fromBox": "q", "toBox": "p"},
                    {"id": "c3", "fromBox": "q", "toBox": "q"}
                ]
            }"#,
            &cfg(),
        )
        .unwrap();
        assert_eq!(doc.name(), "Dupes");
        assert_eq!(doc.box_count(), 3);
        assert_eq!(doc.connection_count(), 1);
        assert_eq!(doc.connections().next().unwrap().id, ConnId::intern("c1"));
    }

    #[test]
    fn export_names_file_after_document() {
        let doc = Document::new("My Story");
        let file = export_document(&doc, &cfg()).unwrap();
        assert_eq!(file.file_name, "My Story.json");
        assert!(file.contents.contains("\n  \"name\": \"My Story\""));

        let unnamed = export_document(&Document::new(""), &cfg()).unwrap();
        assert_eq!(unnamed.file_name, "storyboard.json");
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("sb-core-file-store-{}", std::process::id()));
        let mut store = FileStore::new(&dir);
        assert_eq!(store.get("missing").unwrap(), None);
        store.set("board", "{\"boxes\":[]}").unwrap();
        assert_eq!(store.get("board").unwrap().as_deref(), Some("{\"boxes\":[]}"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

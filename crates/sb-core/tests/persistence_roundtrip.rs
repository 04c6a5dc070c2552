//! Integration tests: document → store/export → document.

use pretty_assertions::assert_eq;
use sb_core::store::{FileStore, parse_document, snapshot};
use sb_core::*;

const THREE_ACT: &str = include_str!("fixtures/three_act.json");
const MALFORMED: &str = include_str!("fixtures/malformed_entries.json");
const NOT_AN_ARRAY: &str = include_str!("fixtures/not_an_array.json");
const IDLESS_BEFORE_SAVED_IDS: &str = include_str!("fixtures/idless_before_saved_ids.json");

#[test]
fn fixture_imports_intact() {
    let cfg = BoardConfig::default();
    let doc = import_document(THREE_ACT, &cfg).expect("valid fixture");

    assert_eq!(doc.name(), "Three Act");
    let ids: Vec<&str> = doc.boxes().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, ["setup", "confrontation", "resolution"]);

    let res = doc.find_box(BoxId::intern("resolution")).unwrap();
    assert_eq!((res.x, res.y), (820.5, 300.25));

    let dashed = doc.find_connection(ConnId::intern("c-conf-res")).unwrap();
    assert_eq!(dashed.style, ConnectorStyle::Dashed);
    assert_eq!(dashed.color, "#8e44ad");
}

#[test]
fn export_then_import_is_identity() {
    let cfg = BoardConfig::default();
    let doc = import_document(THREE_ACT, &cfg).unwrap();

    let file = export_document(&doc, &cfg).unwrap();
    assert_eq!(file.file_name, "Three Act.json");
    let back = import_document(&file.contents, &cfg).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn edited_document_survives_store_roundtrip() {
    let cfg = BoardConfig::default();
    let mut doc = import_document(THREE_ACT, &cfg).unwrap();
    let setup = BoxId::intern("setup");
    let res = BoxId::intern("resolution");

    doc.update_box_geometry(setup, GeometryPatch::position(13.75, 99.0), &cfg);
    doc.update_box_text(res, TextField::Text, "They leave at dawn.\nThe end.");
    doc.create_connection(res, setup, &cfg).unwrap();
    doc.set_name("Three Act (revised)");

    let store = MemoryStore::new();
    let mut gateway = Gateway::new(store.clone(), cfg.clone());
    gateway.save(&doc).unwrap();

    let raw = store.record(&cfg.storage_key).expect("snapshot written");
    assert_eq!(raw, snapshot(&doc).unwrap());
    assert_eq!(gateway.load(), doc);
}

#[test]
fn malformed_entries_are_salvaged() {
    let cfg = BoardConfig::default();
    let doc = import_document(MALFORMED, &cfg).unwrap();

    assert_eq!(doc.name(), "Salvage");
    assert_eq!(doc.box_count(), 3);
    let titles: Vec<&str> = doc.boxes().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Kept", "No id", "Second keep"]);

    // The duplicated id was regenerated; the first occurrence keeps it.
    let keep = doc.find_box(BoxId::intern("keep")).unwrap();
    assert_eq!(keep.x, 10.0);
    assert_eq!(keep.width, cfg.default_width);

    // Stale references are kept, the self-loop and incomplete entries are not.
    assert_eq!(doc.connection_count(), 2);
    assert!(doc.connections().all(|c| c.from_box != c.to_box));
    assert!(doc.connections().all(|c| c.style == ConnectorStyle::Solid));
    let first = doc.find_connection(ConnId::intern("ok")).unwrap();
    assert_eq!(first.to_box, BoxId::intern("dangling"));
}

#[test]
fn idless_boxes_never_take_over_saved_connections() {
    let cfg = BoardConfig::default();
    let doc = import_document(IDLESS_BEFORE_SAVED_IDS, &cfg).unwrap();
    assert_eq!(doc.box_count(), 6);

    let title = |id: &str| doc.find_box(BoxId::intern(id)).map(|b| b.title.as_str());
    assert_eq!(title("box-1"), Some("first saved"));
    assert_eq!(title("box-2"), Some("explicit"));
    assert_eq!(title("box-3"), Some("third saved"));

    let reserved = ["box-1", "box-2", "box-3", "box-4", "other"];
    for generated in doc.boxes().filter(|b| b.title.contains("no id")) {
        assert!(!reserved.contains(&generated.id.as_str()), "{}", generated.id);
    }

    let c1 = doc.find_connection(ConnId::intern("c1")).unwrap();
    assert_eq!(doc.find_box(c1.from_box).unwrap().title, "explicit");
    assert_eq!(
        doc.connection_between(BoxId::intern("box-1"), BoxId::intern("box-3")),
        Some(ConnId::intern("c2"))
    );
    // The stale reference stays stale.
    let c3 = doc.find_connection(ConnId::intern("c3")).unwrap();
    assert!(!doc.contains_box(c3.from_box));
}

#[test]
fn non_array_boxes_are_refused() {
    let cfg = BoardConfig::default();
    let err = import_document(NOT_AN_ARRAY, &cfg).unwrap_err();
    assert_eq!(err, ImportError::MissingArray("boxes"));
}

#[test]
fn stored_name_is_kept_and_missing_name_defaults() {
    let cfg = BoardConfig::default();
    let doc = parse_document(r#"{"boxes": [], "connections": []}"#, &cfg.untitled_name, &cfg)
        .unwrap();
    assert_eq!(doc.name(), "Untitled Storyboard");

    let imported = import_document(r#"{"name": "", "boxes": [], "connections": []}"#, &cfg)
        .unwrap();
    assert_eq!(imported.name(), "Imported Storyboard");

    let cleared = parse_document(
        r#"{"name": "", "boxes": [], "connections": []}"#,
        &cfg.untitled_name,
        &cfg,
    )
    .unwrap();
    assert_eq!(cleared.name(), "");
}

#[test]
fn file_store_backs_a_gateway() {
    let cfg = BoardConfig::default();
    let dir = std::env::temp_dir().join(format!("sb-core-gateway-{}", std::process::id()));
    let doc = import_document(THREE_ACT, &cfg).unwrap();

    let mut gateway = Gateway::new(FileStore::new(&dir), cfg.clone());
    gateway.save(&doc).unwrap();
    assert!(dir.join("storyboard-state.json").exists());

    let reopened = Gateway::new(FileStore::new(&dir), cfg);
    assert_eq!(reopened.load(), doc);
    let _ = std::fs::remove_dir_all(&dir);
}

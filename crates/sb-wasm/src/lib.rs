//! WASM bridge for the storyboard editor. Exposes the Rust session to
//! JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The page owns the DOM: it
//! forwards pointer, key, text and size events here, then applies the JSON
//! view commands returned by [`StoryboardApp::drain_view_commands`].

#[cfg(target_arch = "wasm32")]
mod console;
mod storage;

pub use storage::LocalStorage;

use log::warn;
use sb_core::{BoardConfig, BoxId, ConnId, ConnectorStyle, Gateway, Point, Store, TextField, ViewTransform};
use sb_editor::{BoxPart, Editor, InputEvent, PointerTarget, RecordingView, ShortcutAction};
use serde_json::json;
use wasm_bindgen::prelude::*;

/// The main WASM-facing session controller.
#[wasm_bindgen]
pub struct StoryboardApp {
    editor: Editor,
    view: RecordingView,
}

#[wasm_bindgen]
impl StoryboardApp {
    /// Load from `localStorage`. `config_json` may override any subset of
    /// the board configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> StoryboardApp {
        #[cfg(target_arch = "wasm32")]
        console::install();

        let config = match config_json.as_deref() {
            Some(json) => BoardConfig::from_json(json).unwrap_or_else(|e| {
                warn!("ignoring invalid board config: {e}");
                BoardConfig::default()
            }),
            None => BoardConfig::default(),
        };
        Self::with_store(LocalStorage, config)
    }

    pub fn name(&self) -> String {
        self.editor.document().name().to_string()
    }

    pub fn rename(&mut self, name: &str) -> bool {
        self.editor.rename(name)
    }

    /// Current scroll offset, zoom and container size.
    pub fn set_view(&mut self, scroll_x: f64, scroll_y: f64, zoom: f64, width: f64, height: f64) {
        self.editor
            .set_view_transform(ViewTransform::new(scroll_x, scroll_y, zoom));
        self.editor.set_viewport_size(width, height);
    }

    // ─── Pointer API ─────────────────────────────────────────────────────

    /// `box_id` and `part` (`body`, `text`, `controls`, `resize`, `connect`)
    /// describe the element under the pointer; omit them to let the core hit
    /// test.
    pub fn pointer_down(
        &mut self,
        x: f64,
        y: f64,
        pointer_id: i32,
        box_id: Option<String>,
        part: Option<String>,
    ) {
        let target = match (box_id, part.as_deref().and_then(BoxPart::parse)) {
            (Some(id), Some(part)) => Some(PointerTarget {
                box_id: BoxId::intern(&id),
                part,
            }),
            _ => None,
        };
        self.editor.handle_input(&InputEvent::PointerDown {
            x,
            y,
            pointer_id,
            target,
        });
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, pointer_id: i32) {
        self.editor
            .handle_input(&InputEvent::pointer_move(x, y, pointer_id));
    }

    pub fn pointer_up(&mut self, x: f64, y: f64, pointer_id: i32) {
        self.editor
            .handle_input(&InputEvent::pointer_up(x, y, pointer_id));
    }

    pub fn pointer_cancel(&mut self, pointer_id: i32) {
        self.editor
            .handle_input(&InputEvent::PointerCancel { pointer_id });
    }

    // ─── Keyboard Shortcut API ───────────────────────────────────────────

    /// Handle a keyboard event. Returns the action name (`addBox`,
    /// `deleteBox`, `export`, `import`, `clearAll`) or an empty string.
    /// `export` and `import` are left for the page to finish.
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        in_text_field: bool,
    ) -> String {
        self.editor
            .handle_key(key, ctrl, shift, alt, meta, in_text_field)
            .map(action_to_name)
            .unwrap_or_default()
            .to_string()
    }

    // ─── Boxes ───────────────────────────────────────────────────────────

    /// Context menu. Returns the new box id.
    pub fn add_box_at(&mut self, x: f64, y: f64, centered: bool) -> Option<String> {
        self.editor
            .add_box_at(Point::new(x, y), centered)
            .map(|id| id.to_string())
    }

    /// Toolbar button. Returns the new box id.
    pub fn add_box_in_view(&mut self) -> Option<String> {
        self.editor.add_box_in_view().map(|id| id.to_string())
    }

    pub fn delete_box(&mut self, box_id: &str) -> bool {
        self.editor.delete_box(BoxId::intern(box_id))
    }

    /// `field` is `title` or `text`.
    pub fn commit_text(&mut self, box_id: &str, field: &str, value: &str) -> bool {
        let field = match field {
            "title" => TextField::Title,
            "text" => TextField::Text,
            other => {
                warn!("unknown text field {other:?}");
                return false;
            }
        };
        self.editor.commit_text(BoxId::intern(box_id), field, value)
    }

    pub fn set_box_color(&mut self, box_id: &str, color: &str) -> bool {
        self.editor.set_box_color(BoxId::intern(box_id), color)
    }

    /// Layout-reported element size.
    pub fn observe_box_size(&mut self, box_id: &str, width: f64, height: f64) -> bool {
        self.editor
            .observe_box_size(BoxId::intern(box_id), width, height)
    }

    pub fn focused_box(&self) -> Option<String> {
        self.editor.focused().map(|id| id.to_string())
    }

    // ─── Connections ─────────────────────────────────────────────────────

    pub fn delete_connection(&mut self, conn_id: &str) -> bool {
        self.editor.delete_connection(ConnId::intern(conn_id))
    }

    pub fn set_connection_color(&mut self, conn_id: &str, color: &str) -> bool {
        self.editor
            .set_connection_color(ConnId::intern(conn_id), color)
    }

    /// `style` is `solid`, `dashed` or `double`.
    pub fn set_connection_style(&mut self, conn_id: &str, style: &str) -> bool {
        match ConnectorStyle::parse(style) {
            Some(style) => self
                .editor
                .set_connection_style(ConnId::intern(conn_id), style),
            None => false,
        }
    }

    // ─── Document ────────────────────────────────────────────────────────

    pub fn clear_all(&mut self) -> bool {
        self.editor.clear_all()
    }

    /// Pretty-printed document for download.
    pub fn export_json(&self) -> String {
        match self.editor.export() {
            Ok(file) => file.contents,
            Err(e) => {
                warn!("export failed: {e}");
                String::new()
            }
        }
    }

    pub fn export_file_name(&self) -> String {
        self.editor.export_file_name()
    }

    /// Import a file. Returns JSON: `{"ok":true}` or `{"ok":false,"error":"..."}`.
    pub fn import_json(&mut self, contents: &str) -> String {
        match self.editor.import(contents) {
            Ok(()) => json!({ "ok": true }).to_string(),
            Err(e) => json!({ "ok": false, "error": e.to_string() }).to_string(),
        }
    }

    /// The current document in storage shape.
    pub fn document_json(&self) -> String {
        serde_json::to_string(self.editor.document()).unwrap_or_default()
    }

    /// Take every queued view command as a JSON array.
    pub fn drain_view_commands(&self) -> String {
        serde_json::to_string(&self.view.drain()).unwrap_or_else(|e| {
            warn!("could not encode view commands: {e}");
            "[]".to_string()
        })
    }

    /// Set while the durable store is rejecting writes.
    pub fn persist_warning(&self) -> Option<String> {
        self.editor.persist_warning().map(str::to_string)
    }
}

impl StoryboardApp {
    /// Build a session over any store (tests, native hosts).
    pub fn with_store(store: impl Store + 'static, config: BoardConfig) -> Self {
        let view = RecordingView::new();
        let editor = Editor::open(Gateway::new(store, config), Box::new(view.clone()));
        Self { editor, view }
    }
}

fn action_to_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::AddBox => "addBox",
        ShortcutAction::DeleteBox => "deleteBox",
        ShortcutAction::Export => "export",
        ShortcutAction::Import => "import",
        ShortcutAction::ClearAll => "clearAll",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sb_core::MemoryStore;
    use serde_json::Value;

    fn app() -> (StoryboardApp, MemoryStore) {
        let store = MemoryStore::new();
        let app = StoryboardApp::with_store(store.clone(), BoardConfig::default());
        (app, store)
    }

    fn commands(app: &StoryboardApp) -> Vec<Value> {
        match serde_json::from_str(&app.drain_view_commands()).unwrap() {
            Value::Array(items) => items,
            other => panic!("expected an array, got {other}"),
        }
    }

    #[test]
    fn initial_render_is_queued() {
        let (app, _) = app();
        let ops = commands(&app);
        assert_eq!(ops[0]["op"], "renderBox");
        assert_eq!(ops.last().unwrap()["op"], "setCanvasExtent");
        assert!(commands(&app).is_empty());
    }

    #[test]
    fn import_reports_errors_as_json() {
        let (mut app, _) = app();
        let reply: Value =
            serde_json::from_str(&app.import_json(r#"{"boxes":{},"connections":[]}"#)).unwrap();
        assert_eq!(reply["ok"], false);
        assert!(reply["error"].as_str().unwrap().contains("boxes"));

        let reply = app.import_json(r#"{"name":"Fresh","boxes":[],"connections":[]}"#);
        assert_eq!(reply, r#"{"ok":true}"#);
        assert_eq!(app.name(), "Fresh");
        assert_eq!(app.export_file_name(), "Fresh.json");
    }

    #[test]
    fn renderer_targets_drive_gestures() {
        let (mut app, store) = app();
        let id = app.add_box_at(50.0, 50.0, false).unwrap();
        commands(&app);

        app.pointer_down(60.0, 60.0, 1, Some(id.clone()), Some("body".into()));
        app.pointer_move(160.0, 90.0, 1);
        app.pointer_up(160.0, 90.0, 1);
        assert_eq!(app.focused_box().as_deref(), Some(id.as_str()));

        let doc: Value = serde_json::from_str(&store.record("storyboard-state").unwrap()).unwrap();
        let moved = doc["boxes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["id"] == id.as_str())
            .unwrap();
        assert_eq!((moved["x"].as_f64(), moved["y"].as_f64()), (Some(150.0), Some(80.0)));
    }

    #[test]
    fn key_names_are_reported() {
        let (mut app, _) = app();
        app.set_view(0.0, 0.0, 1.0, 1000.0, 800.0);
        assert_eq!(app.handle_key("n", false, false, false, false, false), "addBox");
        assert_eq!(app.handle_key("s", true, false, false, false, false), "export");
        assert_eq!(app.handle_key("q", false, false, false, false, false), "");
    }

    #[test]
    fn unknown_field_and_style_are_refused() {
        let (mut app, _) = app();
        let id = app.add_box_in_view().unwrap();
        assert!(!app.commit_text(&id, "subtitle", "x"));
        assert!(app.commit_text(&id, "title", "Cold open"));
        assert!(!app.set_connection_style("conn-missing", "wavy"));
    }

    #[test]
    fn write_failures_raise_a_warning() {
        let (mut app, store) = app();
        store.set_fail_writes(true);
        assert!(app.rename("Not saved yet"));
        assert!(app.persist_warning().is_some());
        store.set_fail_writes(false);
        app.rename("Saved");
        assert_eq!(app.persist_warning(), None);
    }
}

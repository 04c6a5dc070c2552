//! Editing session: gestures, keyboard, pan/zoom and focus on top of the
//! sync engine.

use crate::gesture::{Gesture, GestureEffect, GestureMachine};
use crate::input::InputEvent;
use crate::persist::PersistQueue;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::sync::{Applied, EditMutation, SyncEngine};
use crate::view::ViewSink;
use log::info;
use sb_core::{
    BoxGeometry, BoxId, ConnId, ConnectorStyle, Document, ExportFile, Gateway, ImportError,
    Point, TextField, ViewTransform, export_document, export_file_name, import_document,
};

pub struct Editor {
    engine: SyncEngine,
    gestures: GestureMachine,
    transform: ViewTransform,
    /// Container size in pixels.
    viewport: (f64, f64),
    /// Last box pressed.
    focused: Option<BoxId>,
}

impl Editor {
    /// Open the stored document (or the example story) and render it.
    pub fn open(gateway: Gateway, view: Box<dyn ViewSink>) -> Self {
        Self::with_engine(SyncEngine::load(PersistQueue::new(gateway), view))
    }

    pub fn with_engine(engine: SyncEngine) -> Self {
        Self {
            engine,
            gestures: GestureMachine::new(),
            transform: ViewTransform::default(),
            viewport: (0.0, 0.0),
            focused: None,
        }
    }

    pub fn document(&self) -> &Document {
        self.engine.document()
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn gesture(&self) -> Gesture {
        self.gestures.state()
    }

    pub fn focused(&self) -> Option<BoxId> {
        self.focused
    }

    pub fn persist_warning(&self) -> Option<&str> {
        self.engine.persist_warning()
    }

    pub fn set_view_transform(&mut self, transform: ViewTransform) {
        self.transform = transform;
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    /// Feed a container-space pointer event.
    pub fn handle_input(&mut self, event: &InputEvent) {
        let event = event.to_document(&self.transform);
        let effects = self
            .gestures
            .handle(&event, self.engine.document(), self.engine.config());
        for effect in effects {
            self.apply_effect(effect);
        }
    }

    fn apply_effect(&mut self, effect: GestureEffect) {
        match effect {
            GestureEffect::Focus(id) => self.focused = Some(id),
            GestureEffect::MoveBox { id, x, y } => {
                self.engine.apply_live(EditMutation::MoveBox { id, x, y });
            }
            GestureEffect::ResizeBox { id, width, height } => {
                self.engine
                    .apply_live(EditMutation::ResizeBox { id, width, height });
            }
            GestureEffect::Settle(_) => self.engine.settle(),
            GestureEffect::ShowGuide { from, to } => self.engine.view_mut().show_guide(from, to),
            GestureEffect::HideGuide => self.engine.view_mut().hide_guide(),
            GestureEffect::MarkSource(id) => self.engine.view_mut().mark_connect_source(id),
            GestureEffect::HighlightTarget(id) => self.engine.view_mut().highlight_target(id),
            GestureEffect::Connect { from, to } => {
                self.engine.commit(EditMutation::Connect { from, to });
            }
        }
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Resolve and run a shortcut. Export and import are returned to the host
    /// to finish (download, file picker); everything else is done here.
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        in_text_field: bool,
    ) -> Option<ShortcutAction> {
        let action = if in_text_field {
            ShortcutMap::resolve_in_text(key, ctrl, shift, alt, meta)
        } else {
            ShortcutMap::resolve(key, ctrl, shift, alt, meta)
        }?;
        match action {
            ShortcutAction::AddBox => {
                self.add_box_in_view();
            }
            ShortcutAction::DeleteBox => {
                if let Some(id) = self.focused {
                    self.delete_box(id);
                }
            }
            ShortcutAction::ClearAll => {
                self.clear_all();
            }
            ShortcutAction::Export | ShortcutAction::Import => {}
        }
        Some(action)
    }

    // ─── Box operations ──────────────────────────────────────────────────

    /// Create a default-sized box at a container-space point, either with its
    /// top-left corner there or centred on it.
    pub fn add_box_at(&mut self, point: Point, centered: bool) -> Option<BoxId> {
        let p = self.transform.to_document(point);
        self.add_box_at_document(p, centered)
    }

    /// Create a default-sized box centred in the visible area.
    pub fn add_box_in_view(&mut self) -> Option<BoxId> {
        let (w, h) = self.viewport;
        let visible = self.transform.visible_rect(w, h);
        self.add_box_at_document(visible.center(), true)
    }

    fn add_box_at_document(&mut self, p: Point, centered: bool) -> Option<BoxId> {
        let config = self.engine.config();
        let (w, h) = (config.default_width, config.default_height);
        let (x, y) = if centered {
            (p.x - w / 2.0, p.y - h / 2.0)
        } else {
            (p.x, p.y)
        };
        match self.engine.commit(EditMutation::AddBox {
            geometry: BoxGeometry::new(x, y, w, h),
        }) {
            Applied::BoxAdded(id) => Some(id),
            _ => None,
        }
    }

    pub fn delete_box(&mut self, id: BoxId) -> bool {
        let changed = self.engine.commit(EditMutation::DeleteBox { id }).changed();
        if changed && self.focused == Some(id) {
            self.focused = None;
        }
        changed
    }

    /// Text field lost focus: store its final value.
    pub fn commit_text(&mut self, id: BoxId, field: TextField, value: &str) -> bool {
        self.engine
            .commit(EditMutation::SetText {
                id,
                field,
                value: value.to_string(),
            })
            .changed()
    }

    pub fn set_box_color(&mut self, id: BoxId, color: &str) -> bool {
        self.engine
            .commit(EditMutation::SetBoxColor {
                id,
                color: color.to_string(),
            })
            .changed()
    }

    /// Size reported by the host's layout (user-resizable element, font
    /// change). Differences within the tolerance are ignored.
    pub fn observe_box_size(&mut self, id: BoxId, width: f64, height: f64) -> bool {
        let tolerance = self.engine.config().resize_tolerance;
        let Some(b) = self.engine.document().find_box(id) else {
            return false;
        };
        if (b.width - width).abs() <= tolerance && (b.height - height).abs() <= tolerance {
            return false;
        }
        self.engine
            .commit(EditMutation::ResizeBox { id, width, height })
            .changed()
    }

    // ─── Connection operations ───────────────────────────────────────────

    pub fn connect(&mut self, from: BoxId, to: BoxId) -> Option<ConnId> {
        match self.engine.commit(EditMutation::Connect { from, to }) {
            Applied::Connected(id) => Some(id),
            _ => None,
        }
    }

    pub fn delete_connection(&mut self, id: ConnId) -> bool {
        self.engine
            .commit(EditMutation::DeleteConnection { id })
            .changed()
    }

    pub fn set_connection_color(&mut self, id: ConnId, color: &str) -> bool {
        self.engine
            .commit(EditMutation::SetConnectionColor {
                id,
                color: color.to_string(),
            })
            .changed()
    }

    pub fn set_connection_style(&mut self, id: ConnId, style: ConnectorStyle) -> bool {
        self.engine
            .commit(EditMutation::SetConnectionStyle { id, style })
            .changed()
    }

    // ─── Document operations ─────────────────────────────────────────────

    pub fn rename(&mut self, name: &str) -> bool {
        self.engine
            .commit(EditMutation::Rename {
                name: name.to_string(),
            })
            .changed()
    }

    /// Empty the board. Does nothing when there are no boxes.
    pub fn clear_all(&mut self) -> bool {
        if self.document().box_count() == 0 {
            return false;
        }
        self.abandon_gesture();
        self.engine.commit(EditMutation::Clear).changed()
    }

    pub fn export(&self) -> Result<ExportFile, serde_json::Error> {
        export_document(self.document(), self.engine.config())
    }

    pub fn export_file_name(&self) -> String {
        export_file_name(self.document(), self.engine.config())
    }

    /// Replace the document with an imported file. On error nothing changes.
    pub fn import(&mut self, contents: &str) -> Result<(), ImportError> {
        let document = import_document(contents, self.engine.config())?;
        info!("importing {:?}", document.name());
        self.abandon_gesture();
        self.engine.commit(EditMutation::Replace { document });
        Ok(())
    }

    /// Forget focus and any gesture bound to the outgoing document.
    fn abandon_gesture(&mut self) {
        self.focused = None;
        for effect in self.gestures.reset() {
            self.apply_effect(effect);
        }
    }
}

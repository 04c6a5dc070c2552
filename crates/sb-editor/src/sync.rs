//! View synchronizer: document ↔ view ↔ store.
//!
//! The sync engine holds the authoritative document and keeps the view and
//! the durable store in step with it:
//!
//! - **Live** mutations (drag/resize frames) update the model, redraw the
//!   affected box and its incident connectors, and refresh the canvas extent.
//!   Nothing is persisted.
//!
//! - **Committed** mutations do the same and then write a snapshot before
//!   returning.
//!
//! - **Full replacement** (import, clear) tears down every element and
//!   rebuilds the view from scratch.

use crate::persist::PersistQueue;
use crate::view::ViewSink;
use log::{debug, info, trace};
use sb_core::{
    BoardConfig, BoxGeometry, BoxId, CanvasExtent, ConnId, ConnectRejection, ConnectorStyle,
    Document, GeometryPatch, TextField, bounding_extent, connector_endpoints,
};

/// A change to the document.
#[derive(Debug, Clone)]
pub enum EditMutation {
    AddBox { geometry: BoxGeometry },
    DeleteBox { id: BoxId },
    MoveBox { id: BoxId, x: f64, y: f64 },
    ResizeBox { id: BoxId, width: f64, height: f64 },
    SetText { id: BoxId, field: TextField, value: String },
    SetBoxColor { id: BoxId, color: String },
    Connect { from: BoxId, to: BoxId },
    DeleteConnection { id: ConnId },
    SetConnectionColor { id: ConnId, color: String },
    SetConnectionStyle { id: ConnId, style: ConnectorStyle },
    Rename { name: String },
    Replace { document: Document },
    Clear,
}

/// Outcome of applying a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Target missing or value already current.
    Unchanged,
    Changed,
    BoxAdded(BoxId),
    Connected(ConnId),
    /// The connect guard declined. Never surfaced to the user.
    Rejected(ConnectRejection),
}

impl Applied {
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged | Self::Rejected(_))
    }
}

/// Owns the document, the persistence queue and the view.
pub struct SyncEngine {
    doc: Document,
    config: BoardConfig,
    persist: PersistQueue,
    view: Box<dyn ViewSink>,
    /// Last extent pushed to the view.
    extent: Option<CanvasExtent>,
}

impl SyncEngine {
    /// Load the stored document and render it.
    pub fn load(persist: PersistQueue, view: Box<dyn ViewSink>) -> Self {
        let doc = persist.load();
        Self::new(doc, persist, view)
    }

    /// Take ownership of `doc` and render it. Nothing is persisted.
    pub fn new(doc: Document, persist: PersistQueue, view: Box<dyn ViewSink>) -> Self {
        let config = persist.gateway().config().clone();
        let mut engine = Self {
            doc,
            config,
            persist,
            view,
            extent: None,
        };
        engine.rebuild();
        engine
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn view_mut(&mut self) -> &mut dyn ViewSink {
        self.view.as_mut()
    }

    pub fn persist_warning(&self) -> Option<&str> {
        self.persist.warning()
    }

    // ─── Entry points ────────────────────────────────────────────────────

    /// Apply and persist.
    pub fn commit(&mut self, mutation: EditMutation) -> Applied {
        let applied = self.apply(mutation);
        if applied.changed() {
            self.persist.commit(&self.doc);
        }
        applied
    }

    /// Apply without persisting (drag/resize frames).
    pub fn apply_live(&mut self, mutation: EditMutation) -> Applied {
        self.apply(mutation)
    }

    /// End of a gesture: persist the settled state.
    pub fn settle(&mut self) {
        self.push_extent();
        self.persist.commit(&self.doc);
    }

    // ─── Mutation dispatch ───────────────────────────────────────────────

    fn apply(&mut self, mutation: EditMutation) -> Applied {
        match mutation {
            EditMutation::AddBox { geometry } => {
                let id = self.doc.create_box(geometry, &self.config);
                if let Some(b) = self.doc.find_box(id) {
                    self.view.render_box(b);
                }
                self.push_extent();
                debug!("added box {id}");
                Applied::BoxAdded(id)
            }
            EditMutation::DeleteBox { id } => {
                let Some(removed) = self.doc.delete_box(id) else {
                    return Applied::Unchanged;
                };
                self.view.remove_box_element(id);
                for conn in removed.connections {
                    self.view.remove_connection_element(conn);
                }
                self.push_extent();
                Applied::Changed
            }
            EditMutation::MoveBox { id, x, y } => {
                self.update_geometry(id, GeometryPatch::position(x, y))
            }
            EditMutation::ResizeBox { id, width, height } => {
                self.update_geometry(id, GeometryPatch::size(width, height))
            }
            EditMutation::SetText { id, field, value } => {
                if !self.doc.update_box_text(id, field, value) {
                    return Applied::Unchanged;
                }
                self.refresh_content(id);
                Applied::Changed
            }
            EditMutation::SetBoxColor { id, color } => {
                if !self.doc.set_box_color(id, color) {
                    return Applied::Unchanged;
                }
                self.refresh_content(id);
                Applied::Changed
            }
            EditMutation::Connect { from, to } => {
                match self.doc.create_connection(from, to, &self.config) {
                    Ok(id) => {
                        self.render_connection(id);
                        Applied::Connected(id)
                    }
                    Err(reason) => {
                        debug!("connection {from} → {to} declined: {reason}");
                        Applied::Rejected(reason)
                    }
                }
            }
            EditMutation::DeleteConnection { id } => {
                if self.doc.delete_connection(id).is_none() {
                    return Applied::Unchanged;
                }
                self.view.remove_connection_element(id);
                Applied::Changed
            }
            EditMutation::SetConnectionColor { id, color } => {
                if !self.doc.set_connection_color(id, color) {
                    return Applied::Unchanged;
                }
                self.render_connection(id);
                Applied::Changed
            }
            EditMutation::SetConnectionStyle { id, style } => {
                if !self.doc.set_connection_style(id, style) {
                    return Applied::Unchanged;
                }
                self.render_connection(id);
                Applied::Changed
            }
            EditMutation::Rename { name } => {
                if self.doc.set_name(name) {
                    Applied::Changed
                } else {
                    Applied::Unchanged
                }
            }
            EditMutation::Replace { document } => {
                self.teardown();
                self.doc.replace_document(document);
                info!(
                    "document replaced: {} boxes, {} connections",
                    self.doc.box_count(),
                    self.doc.connection_count()
                );
                self.rebuild();
                Applied::Changed
            }
            EditMutation::Clear => {
                self.teardown();
                self.doc.clear(&self.config);
                info!("document cleared");
                self.rebuild();
                Applied::Changed
            }
        }
    }

    fn update_geometry(&mut self, id: BoxId, patch: GeometryPatch) -> Applied {
        if !self.doc.update_box_geometry(id, patch, &self.config) {
            return Applied::Unchanged;
        }
        if let Some(b) = self.doc.find_box(id) {
            trace!("box {id} now at ({}, {}) {}×{}", b.x, b.y, b.width, b.height);
            self.view.update_box_geometry(b);
        }
        self.redraw_incident(id);
        self.push_extent();
        Applied::Changed
    }

    // ─── View helpers ────────────────────────────────────────────────────

    /// Recompute every connector touching `id`. Stale ones are skipped.
    fn redraw_incident(&mut self, id: BoxId) {
        for conn_id in self.doc.incident_connections(id) {
            let Some(conn) = self.doc.find_connection(conn_id) else {
                continue;
            };
            if let Some(path) = connector_endpoints(conn, &self.doc) {
                self.view.update_connector_geometry(conn_id, path);
            }
        }
    }

    fn render_connection(&mut self, id: ConnId) {
        let Some(conn) = self.doc.find_connection(id) else {
            return;
        };
        if let Some(path) = connector_endpoints(conn, &self.doc) {
            self.view.render_connection(conn, path);
        }
    }

    fn refresh_content(&mut self, id: BoxId) {
        if let Some(b) = self.doc.find_box(id) {
            self.view.update_box_content(b);
        }
    }

    /// Push the canvas extent when it differs from the last one pushed.
    fn push_extent(&mut self) {
        let extent = bounding_extent(&self.doc, self.config.canvas_padding);
        if self.extent != Some(extent) {
            self.extent = Some(extent);
            self.view.set_canvas_extent(extent);
        }
    }

    fn teardown(&mut self) {
        for b in self.doc.boxes() {
            self.view.remove_box_element(b.id);
        }
        for conn in self.doc.connections() {
            self.view.remove_connection_element(conn.id);
        }
    }

    fn rebuild(&mut self) {
        for b in self.doc.boxes() {
            self.view.render_box(b);
        }
        for conn in self.doc.connections() {
            match connector_endpoints(conn, &self.doc) {
                Some(path) => self.view.render_connection(conn, path),
                None => debug!("skipping stale connection {}", conn.id),
            }
        }
        self.push_extent();
    }
}

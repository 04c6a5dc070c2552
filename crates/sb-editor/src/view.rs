//! The view collaborator.
//!
//! The engine never touches a rendering toolkit directly; it issues calls on
//! a [`ViewSink`]. [`RecordingView`] turns those calls into serializable
//! [`ViewCommand`]s for tests and for hosts that replay them elsewhere.

use sb_core::{BoxId, CanvasExtent, ConnId, Connection, Line, Point, StoryBox};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Rendering surface driven by the `SyncEngine`.
pub trait ViewSink {
    /// Create the element for a box.
    fn render_box(&mut self, b: &StoryBox);
    fn update_box_geometry(&mut self, b: &StoryBox);
    /// Title, text or border colour changed.
    fn update_box_content(&mut self, _b: &StoryBox) {}
    fn remove_box_element(&mut self, id: BoxId);
    /// Create (or replace) the element for a connection.
    fn render_connection(&mut self, conn: &Connection, path: Line);
    fn remove_connection_element(&mut self, id: ConnId);
    fn update_connector_geometry(&mut self, id: ConnId, path: Line);
    fn set_canvas_extent(&mut self, extent: CanvasExtent);

    // ── Transient gesture feedback ──
    fn show_guide(&mut self, _from: Point, _to: Point) {}
    fn hide_guide(&mut self) {}
    fn mark_connect_source(&mut self, _id: Option<BoxId>) {}
    fn highlight_target(&mut self, _id: Option<BoxId>) {}
}

/// One recorded view call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ViewCommand {
    RenderBox {
        #[serde(rename = "box")]
        story_box: StoryBox,
    },
    UpdateBoxGeometry {
        id: BoxId,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    UpdateBoxContent {
        #[serde(rename = "box")]
        story_box: StoryBox,
    },
    RemoveBox { id: BoxId },
    RenderConnection { connection: Connection, path: Line },
    RemoveConnection { id: ConnId },
    UpdateConnector { id: ConnId, path: Line },
    SetCanvasExtent { extent: CanvasExtent },
    ShowGuide { from: Point, to: Point },
    HideGuide,
    MarkConnectSource { id: Option<BoxId> },
    HighlightTarget { id: Option<BoxId> },
}

/// A `ViewSink` that records every call. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    commands: Rc<RefCell<Vec<ViewCommand>>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every command recorded so far.
    pub fn drain(&self) -> Vec<ViewCommand> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }

    fn push(&self, command: ViewCommand) {
        self.commands.borrow_mut().push(command);
    }
}

impl ViewSink for RecordingView {
    fn render_box(&mut self, b: &StoryBox) {
        self.push(ViewCommand::RenderBox { story_box: b.clone() });
    }

    fn update_box_geometry(&mut self, b: &StoryBox) {
        self.push(ViewCommand::UpdateBoxGeometry {
            id: b.id,
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
        });
    }

    fn update_box_content(&mut self, b: &StoryBox) {
        self.push(ViewCommand::UpdateBoxContent { story_box: b.clone() });
    }

    fn remove_box_element(&mut self, id: BoxId) {
        self.push(ViewCommand::RemoveBox { id });
    }

    fn render_connection(&mut self, conn: &Connection, path: Line) {
        self.push(ViewCommand::RenderConnection {
            connection: conn.clone(),
            path,
        });
    }

    fn remove_connection_element(&mut self, id: ConnId) {
        self.push(ViewCommand::RemoveConnection { id });
    }

    fn update_connector_geometry(&mut self, id: ConnId, path: Line) {
        self.push(ViewCommand::UpdateConnector { id, path });
    }

    fn set_canvas_extent(&mut self, extent: CanvasExtent) {
        self.push(ViewCommand::SetCanvasExtent { extent });
    }

    fn show_guide(&mut self, from: Point, to: Point) {
        self.push(ViewCommand::ShowGuide { from, to });
    }

    fn hide_guide(&mut self) {
        self.push(ViewCommand::HideGuide);
    }

    fn mark_connect_source(&mut self, id: Option<BoxId>) {
        self.push(ViewCommand::MarkConnectSource { id });
    }

    fn highlight_target(&mut self, id: Option<BoxId>) {
        self.push(ViewCommand::HighlightTarget { id });
    }
}

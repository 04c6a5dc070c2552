//! Input abstraction layer.
//!
//! Normalizes mouse, touch, and pen pointer events into a unified
//! `InputEvent` enum consumed by the gesture machine. Positions arrive in
//! container space; [`InputEvent::to_document`] maps them through the
//! current pan/zoom.

use sb_core::{BoxId, Point, ViewTransform};

/// Region of a box element a pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxPart {
    Body,
    /// Editable title or text. Never starts a gesture.
    Text,
    /// Colour picker and delete button. Never starts a gesture.
    Controls,
    ResizeHandle,
    ConnectHandle,
}

impl BoxPart {
    /// Parse the part name sent by the rendering layer.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "body" => Some(Self::Body),
            "text" => Some(Self::Text),
            "controls" => Some(Self::Controls),
            "resize" => Some(Self::ResizeHandle),
            "connect" => Some(Self::ConnectHandle),
            _ => None,
        }
    }
}

/// What the renderer says is under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerTarget {
    pub box_id: BoxId,
    pub part: BoxPart,
}

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed. `target` is `None` when the renderer leaves hit
    /// testing to the core.
    PointerDown {
        x: f64,
        y: f64,
        pointer_id: i32,
        target: Option<PointerTarget>,
    },

    PointerMove { x: f64, y: f64, pointer_id: i32 },

    PointerUp { x: f64, y: f64, pointer_id: i32 },

    /// The platform took the pointer away (touch scroll, lost capture).
    PointerCancel { pointer_id: i32 },
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64, pointer_id: i32) -> Self {
        Self::PointerDown {
            x,
            y,
            pointer_id,
            target: None,
        }
    }

    pub fn pointer_down_on(x: f64, y: f64, pointer_id: i32, box_id: BoxId, part: BoxPart) -> Self {
        Self::PointerDown {
            x,
            y,
            pointer_id,
            target: Some(PointerTarget { box_id, part }),
        }
    }

    pub fn pointer_move(x: f64, y: f64, pointer_id: i32) -> Self {
        Self::PointerMove { x, y, pointer_id }
    }

    pub fn pointer_up(x: f64, y: f64, pointer_id: i32) -> Self {
        Self::PointerUp { x, y, pointer_id }
    }

    pub fn pointer_id(&self) -> i32 {
        match self {
            Self::PointerDown { pointer_id, .. }
            | Self::PointerMove { pointer_id, .. }
            | Self::PointerUp { pointer_id, .. }
            | Self::PointerCancel { pointer_id } => *pointer_id,
        }
    }

    /// Extract position if the event carries one.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. } => Some(Point::new(*x, *y)),
            Self::PointerCancel { .. } => None,
        }
    }

    /// The same event with its position mapped from container space into
    /// document space.
    pub fn to_document(&self, view: &ViewTransform) -> Self {
        let mut event = self.clone();
        match &mut event {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. } => {
                let p = view.to_document(Point::new(*x, *y));
                *x = p.x;
                *y = p.y;
            }
            Self::PointerCancel { .. } => {}
        }
        event
    }
}

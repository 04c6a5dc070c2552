//! Gesture state machine for canvas interactions.
//!
//! Translates pointer events into `GestureEffect`s that the editor applies
//! through the `SyncEngine`. The machine only reads the document; it never
//! mutates it, so every transition is testable without a view.
//!
//! | Pressed part     | Gesture      | While moving                   | On release             |
//! |------------------|--------------|--------------------------------|------------------------|
//! | body             | `Dragging`   | live move (x, y clamped ≥ 0)   | settle                 |
//! | resize handle    | `Resizing`   | live resize (clamped to min)   | settle                 |
//! | connect handle   | `Connecting` | guide line + target highlight  | try `create_connection` |
//! | text / controls  | none         | —                              | —                      |

use crate::hit::{box_at, hit_test};
use crate::input::{BoxPart, InputEvent, PointerTarget};
use log::{debug, trace};
use sb_core::geometry::connection_anchor;
use sb_core::{BoardConfig, BoxId, Document, Point, Vec2};
use smallvec::{SmallVec, smallvec};

/// The active gesture. At most one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging {
        box_id: BoxId,
        pointer_id: i32,
        /// Pointer position relative to the box origin at press time.
        grab: Vec2,
    },
    Resizing {
        box_id: BoxId,
        pointer_id: i32,
        origin: Point,
        start_width: f64,
        start_height: f64,
    },
    Connecting {
        source: BoxId,
        pointer_id: i32,
        target: Option<BoxId>,
    },
}

impl Gesture {
    /// Pointer captured by the active gesture.
    pub fn pointer_id(&self) -> Option<i32> {
        match self {
            Self::Idle => None,
            Self::Dragging { pointer_id, .. }
            | Self::Resizing { pointer_id, .. }
            | Self::Connecting { pointer_id, .. } => Some(*pointer_id),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// What the editor should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEffect {
    /// The box was pressed and becomes the keyboard focus.
    Focus(BoxId),
    /// Live position write, not persisted.
    MoveBox { id: BoxId, x: f64, y: f64 },
    /// Live size write, not persisted.
    ResizeBox { id: BoxId, width: f64, height: f64 },
    /// Move or resize finished; persist the settled geometry.
    Settle(BoxId),
    ShowGuide { from: Point, to: Point },
    HideGuide,
    MarkSource(Option<BoxId>),
    HighlightTarget(Option<BoxId>),
    Connect { from: BoxId, to: BoxId },
}

pub type Effects = SmallVec<[GestureEffect; 4]>;

/// Pointer-driven gesture machine.
#[derive(Debug, Default)]
pub struct GestureMachine {
    state: Gesture,
}

impl GestureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Gesture {
        self.state
    }

    /// Drop the active gesture without settling or connecting. Used when the
    /// document under it is replaced.
    pub fn reset(&mut self) -> Effects {
        match std::mem::take(&mut self.state) {
            Gesture::Connecting { .. } => smallvec![
                GestureEffect::HideGuide,
                GestureEffect::MarkSource(None),
                GestureEffect::HighlightTarget(None),
            ],
            _ => Effects::new(),
        }
    }

    /// Handle a document-space input event.
    pub fn handle(&mut self, event: &InputEvent, doc: &Document, config: &BoardConfig) -> Effects {
        if let InputEvent::PointerDown {
            x,
            y,
            pointer_id,
            target,
        } = event
        {
            if !self.state.is_idle() {
                debug!("ignoring pointer {pointer_id} press: gesture already active");
                return Effects::new();
            }
            let p = Point::new(*x, *y);
            let target = target.or_else(|| hit_test(doc, p, config));
            return self.begin(p, *pointer_id, target, doc);
        }

        if self.state.pointer_id() != Some(event.pointer_id()) {
            if !self.state.is_idle() {
                debug!("ignoring event from uncaptured pointer {}", event.pointer_id());
            }
            return Effects::new();
        }

        match event {
            InputEvent::PointerMove { x, y, .. } => self.track(Point::new(*x, *y), doc),
            InputEvent::PointerUp { x, y, .. } => self.finish(Some(Point::new(*x, *y)), doc),
            InputEvent::PointerCancel { .. } => self.finish(None, doc),
            InputEvent::PointerDown { .. } => Effects::new(),
        }
    }

    fn begin(&mut self, p: Point, pointer_id: i32, target: Option<PointerTarget>, doc: &Document) -> Effects {
        let Some(PointerTarget { box_id, part }) = target else {
            return Effects::new();
        };
        let Some(b) = doc.find_box(box_id) else {
            debug!("press on unknown box {box_id}");
            return Effects::new();
        };

        match part {
            BoxPart::Body => {
                self.state = Gesture::Dragging {
                    box_id,
                    pointer_id,
                    grab: p - Point::new(b.x, b.y),
                };
                smallvec![GestureEffect::Focus(box_id)]
            }
            BoxPart::ResizeHandle => {
                self.state = Gesture::Resizing {
                    box_id,
                    pointer_id,
                    origin: p,
                    start_width: b.width,
                    start_height: b.height,
                };
                smallvec![GestureEffect::Focus(box_id)]
            }
            BoxPart::ConnectHandle => {
                self.state = Gesture::Connecting {
                    source: box_id,
                    pointer_id,
                    target: None,
                };
                let anchor = connection_anchor(b);
                smallvec![
                    GestureEffect::Focus(box_id),
                    GestureEffect::MarkSource(Some(box_id)),
                    GestureEffect::ShowGuide {
                        from: anchor,
                        to: anchor
                    },
                ]
            }
            BoxPart::Text | BoxPart::Controls => smallvec![GestureEffect::Focus(box_id)],
        }
    }

    fn track(&mut self, p: Point, doc: &Document) -> Effects {
        match &mut self.state {
            Gesture::Idle => Effects::new(),
            Gesture::Dragging { box_id, grab, .. } => {
                let id = *box_id;
                if !doc.contains_box(id) {
                    self.state = Gesture::Idle;
                    return Effects::new();
                }
                let origin = p - *grab;
                trace!("drag {id} to ({}, {})", origin.x, origin.y);
                smallvec![GestureEffect::MoveBox {
                    id,
                    x: origin.x,
                    y: origin.y
                }]
            }
            Gesture::Resizing {
                box_id,
                origin,
                start_width,
                start_height,
                ..
            } => {
                let id = *box_id;
                if !doc.contains_box(id) {
                    self.state = Gesture::Idle;
                    return Effects::new();
                }
                let delta = p - *origin;
                smallvec![GestureEffect::ResizeBox {
                    id,
                    width: *start_width + delta.x,
                    height: *start_height + delta.y
                }]
            }
            Gesture::Connecting { source, target, .. } => {
                let Some(b) = doc.find_box(*source) else {
                    self.state = Gesture::Idle;
                    return smallvec![GestureEffect::HideGuide, GestureEffect::MarkSource(None)];
                };
                let mut effects: Effects = smallvec![GestureEffect::ShowGuide {
                    from: connection_anchor(b),
                    to: p
                }];
                let candidate = box_at(doc, p, Some(*source));
                if candidate != *target {
                    *target = candidate;
                    effects.push(GestureEffect::HighlightTarget(candidate));
                }
                effects
            }
        }
    }

    /// Release (`Some(p)`) or cancel (`None`).
    fn finish(&mut self, release: Option<Point>, doc: &Document) -> Effects {
        match std::mem::take(&mut self.state) {
            Gesture::Idle => Effects::new(),
            Gesture::Dragging { box_id, .. } | Gesture::Resizing { box_id, .. } => {
                smallvec![GestureEffect::Settle(box_id)]
            }
            Gesture::Connecting { source, .. } => {
                let mut effects: Effects = smallvec![
                    GestureEffect::HideGuide,
                    GestureEffect::MarkSource(None),
                    GestureEffect::HighlightTarget(None),
                ];
                if let Some(to) = release.and_then(|p| box_at(doc, p, Some(source))) {
                    effects.push(GestureEffect::Connect { from: source, to });
                }
                effects
            }
        }
    }
}

//! Connector geometry: anchors, endpoints, and canvas extent.
//!
//! Everything here is derived from box geometry on demand and never stored.

use crate::model::{Connection, Document, StoryBox};
use kurbo::{Line, Point, Rect, Vec2};
use serde::Serialize;

/// Axis-aligned rectangle covered by a box.
pub fn bounds(b: &StoryBox) -> Rect {
    Rect::new(b.x, b.y, b.x + b.width, b.y + b.height)
}

pub fn center(b: &StoryBox) -> Point {
    Point::new(b.x + b.width / 2.0, b.y + b.height / 2.0)
}

/// Bottom-centre of a box, where drag-to-connect starts.
pub fn connection_anchor(b: &StoryBox) -> Point {
    Point::new(b.x + b.width / 2.0, b.y + b.height)
}

/// Centre-to-centre segment of a connection.
///
/// Returns `None` when either endpoint no longer resolves; the caller skips
/// drawing it.
pub fn connector_endpoints(conn: &Connection, doc: &Document) -> Option<Line> {
    let from = doc.find_box(conn.from_box)?;
    let to = doc.find_box(conn.to_box)?;
    Some(Line::new(center(from), center(to)))
}

/// Size the scrollable canvas should take.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CanvasExtent {
    /// No boxes: let the container decide.
    Auto,
    Fixed { width: f64, height: f64 },
}

/// Smallest origin-anchored rectangle containing every box's bottom-right
/// corner, grown by `padding` on both axes.
pub fn bounding_extent(doc: &Document, padding: f64) -> CanvasExtent {
    if doc.box_count() == 0 {
        return CanvasExtent::Auto;
    }
    let (max_x, max_y) = doc.boxes().fold((0.0_f64, 0.0_f64), |(mx, my), b| {
        (mx.max(b.x + b.width), my.max(b.y + b.height))
    });
    CanvasExtent::Fixed {
        width: max_x + padding,
        height: max_y + padding,
    }
}

// ─── Pan / zoom ──────────────────────────────────────────────────────────

/// Scroll offset and zoom of the canvas container.
///
/// Pointer positions arrive relative to the container; document positions
/// are `(pointer + scroll) / zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scroll: Vec2,
    pub zoom: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scroll: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn new(scroll_x: f64, scroll_y: f64, zoom: f64) -> Self {
        Self {
            scroll: Vec2::new(scroll_x, scroll_y),
            zoom,
        }
    }

    fn effective_zoom(&self) -> f64 {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom
        } else {
            1.0
        }
    }

    pub fn to_document(&self, p: Point) -> Point {
        let zoom = self.effective_zoom();
        Point::new((p.x + self.scroll.x) / zoom, (p.y + self.scroll.y) / zoom)
    }

    pub fn to_container(&self, p: Point) -> Point {
        let zoom = self.effective_zoom();
        Point::new(p.x * zoom - self.scroll.x, p.y * zoom - self.scroll.y)
    }

    /// Document-space rectangle visible in a container of the given size.
    pub fn visible_rect(&self, width: f64, height: f64) -> Rect {
        Rect::from_points(
            self.to_document(Point::ZERO),
            self.to_document(Point::new(width, height)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::model::{BoxGeometry, GeometryPatch};

    #[test]
    fn anchors() {
        let cfg = BoardConfig::default();
        let mut doc = Document::new("g");
        let id = doc.create_box(BoxGeometry::new(100.0, 100.0, 200.0, 150.0), &cfg);
        let b = doc.find_box(id).unwrap();
        assert_eq!(center(b), Point::new(200.0, 175.0));
        assert_eq!(connection_anchor(b), Point::new(200.0, 250.0));
        assert_eq!(bounds(b), Rect::new(100.0, 100.0, 300.0, 250.0));
    }

    #[test]
    fn endpoints_follow_boxes() {
        let cfg = BoardConfig::default();
        let mut doc = Document::new("g");
        let a = doc.create_box(BoxGeometry::new(100.0, 100.0, 200.0, 150.0), &cfg);
        let b = doc.create_box(BoxGeometry::new(400.0, 100.0, 200.0, 150.0), &cfg);
        let c = doc.create_connection(a, b, &cfg).unwrap();

        let line = connector_endpoints(doc.find_connection(c).unwrap(), &doc).unwrap();
        assert_eq!(line.p0, Point::new(200.0, 175.0));
        assert_eq!(line.p1, Point::new(500.0, 175.0));

        doc.update_box_geometry(a, GeometryPatch::position(300.0, 300.0), &cfg);
        let line = connector_endpoints(doc.find_connection(c).unwrap(), &doc).unwrap();
        assert_eq!(line.p0, Point::new(400.0, 375.0));
        assert_eq!(line.p1, Point::new(500.0, 175.0));
    }

    #[test]
    fn stale_endpoint_yields_none() {
        let cfg = BoardConfig::default();
        let mut doc = Document::new("g");
        let a = doc.create_box(BoxGeometry::new(0.0, 0.0, 200.0, 150.0), &cfg);
        let b = doc.create_box(BoxGeometry::new(300.0, 0.0, 200.0, 150.0), &cfg);
        let c = doc.create_connection(a, b, &cfg).unwrap();
        let conn = doc.find_connection(c).unwrap().clone();
        doc.delete_box(b);
        assert!(connector_endpoints(&conn, &doc).is_none());
    }

    #[test]
    fn extent_pads_furthest_corner() {
        let cfg = BoardConfig::default();
        let mut doc = Document::new("g");
        assert_eq!(bounding_extent(&doc, 500.0), CanvasExtent::Auto);

        doc.create_box(BoxGeometry::new(100.0, 700.0, 200.0, 150.0), &cfg);
        doc.create_box(BoxGeometry::new(900.0, 20.0, 300.0, 150.0), &cfg);
        assert_eq!(
            bounding_extent(&doc, 500.0),
            CanvasExtent::Fixed {
                width: 1700.0,
                height: 1350.0
            }
        );
    }

    #[test]
    fn view_transform_inverts() {
        let view = ViewTransform::new(120.0, 40.0, 2.0);
        let p = Point::new(30.0, 60.0);
        let doc_p = view.to_document(p);
        assert_eq!(doc_p, Point::new(75.0, 50.0));
        assert_eq!(view.to_container(doc_p), p);

        let broken = ViewTransform::new(0.0, 0.0, 0.0);
        assert_eq!(broken.to_document(p), p);
    }
}

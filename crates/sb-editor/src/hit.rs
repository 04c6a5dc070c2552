//! Hit testing: point → box lookup.
//!
//! Walks boxes in reverse paint order (last painted = topmost) to find what
//! sits under a document-space position. Used when the rendering layer does
//! not supply its own pointer target.

use crate::input::{BoxPart, PointerTarget};
use sb_core::geometry::connection_anchor;
use sb_core::{BoardConfig, BoxId, Document, Point, StoryBox};

/// Inclusive containment, so a pointer on the border still counts.
fn contains(b: &StoryBox, p: Point) -> bool {
    p.x >= b.x && p.x <= b.x + b.width && p.y >= b.y && p.y <= b.y + b.height
}

/// Which part of `b`, if any, is at `p`.
fn part_at(b: &StoryBox, p: Point, config: &BoardConfig) -> Option<BoxPart> {
    // The connect handle straddles the bottom edge, so check it first.
    if connection_anchor(b).distance(p) <= config.connect_handle_radius {
        return Some(BoxPart::ConnectHandle);
    }
    if !contains(b, p) {
        return None;
    }
    let grip = config.resize_handle_size;
    if p.x >= b.x + b.width - grip && p.y >= b.y + b.height - grip {
        Some(BoxPart::ResizeHandle)
    } else {
        Some(BoxPart::Body)
    }
}

/// Find the topmost box region at `p`. Returns `None` over empty canvas.
pub fn hit_test(doc: &Document, p: Point, config: &BoardConfig) -> Option<PointerTarget> {
    doc.boxes().rev().find_map(|b| {
        part_at(b, p, config).map(|part| PointerTarget { box_id: b.id, part })
    })
}

/// Topmost box whose bounds contain `p`, skipping `exclude`.
/// Used to pick the candidate target of a connect gesture.
pub fn box_at(doc: &Document, p: Point, exclude: Option<BoxId>) -> Option<BoxId> {
    doc.boxes()
        .rev()
        .filter(|b| Some(b.id) != exclude)
        .find(|b| contains(b, p))
        .map(|b| b.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::BoxGeometry;

    fn two_overlapping() -> (Document, BoxId, BoxId, BoardConfig) {
        let cfg = BoardConfig::default();
        let mut doc = Document::new("hit");
        let below = doc.create_box(BoxGeometry::new(0.0, 0.0, 200.0, 150.0), &cfg);
        let above = doc.create_box(BoxGeometry::new(100.0, 100.0, 200.0, 150.0), &cfg);
        (doc, below, above, cfg)
    }

    #[test]
    fn topmost_box_wins() {
        let (doc, below, above, cfg) = two_overlapping();
        let hit = hit_test(&doc, Point::new(150.0, 120.0), &cfg).unwrap();
        assert_eq!(hit.box_id, above);
        assert_eq!(hit.part, BoxPart::Body);

        let hit = hit_test(&doc, Point::new(20.0, 20.0), &cfg).unwrap();
        assert_eq!(hit.box_id, below);
        assert!(hit_test(&doc, Point::new(900.0, 900.0), &cfg).is_none());
    }

    #[test]
    fn handles_are_recognised() {
        let (doc, _, above, cfg) = two_overlapping();
        let resize = hit_test(&doc, Point::new(295.0, 245.0), &cfg).unwrap();
        assert_eq!(resize.part, BoxPart::ResizeHandle);

        // Just below the bottom edge, inside the handle radius.
        let connect = hit_test(&doc, Point::new(200.0, 254.0), &cfg).unwrap();
        assert_eq!(connect, PointerTarget { box_id: above, part: BoxPart::ConnectHandle });
    }

    #[test]
    fn box_at_skips_excluded() {
        let (doc, below, above, _) = two_overlapping();
        let p = Point::new(150.0, 120.0);
        assert_eq!(box_at(&doc, p, None), Some(above));
        assert_eq!(box_at(&doc, p, Some(above)), Some(below));
        assert_eq!(box_at(&doc, Point::new(250.0, 20.0), Some(above)), None);
    }
}

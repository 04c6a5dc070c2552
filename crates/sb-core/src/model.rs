//! Storyboard document model.
//!
//! A document is a name plus two id-keyed arenas: boxes (in paint order,
//! last is topmost) and connections. Connections refer to boxes by id only,
//! so a lookup can fail if a box is gone; callers treat that as "skip",
//! never as an error. An undirected adjacency index over box ids backs the
//! one-connection-per-pair rule and incident-connection queries.

use crate::config::BoardConfig;
use crate::id::{BoxId, ConnId};
use indexmap::IndexMap;
use petgraph::graphmap::UnGraphMap;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

// ─── Boxes ───────────────────────────────────────────────────────────────

/// A positioned, resizable, editable content box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryBox {
    pub id: BoxId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub border_color: String,
}

impl StoryBox {
    pub fn geometry(&self) -> BoxGeometry {
        BoxGeometry {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Position and size of a box, without identity or content.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxGeometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Partial geometry update. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeometryPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl GeometryPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn size(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }
}

/// Which editable text region of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Title,
    Text,
}

// ─── Connections ─────────────────────────────────────────────────────────

/// Stroke style of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectorStyle {
    #[default]
    Solid,
    Dashed,
    Double,
}

impl ConnectorStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Double => "double",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "solid" => Some(Self::Solid),
            "dashed" => Some(Self::Dashed),
            "double" => Some(Self::Double),
            _ => None,
        }
    }
}

impl Serialize for ConnectorStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Unknown style names decode as `Solid`.
impl<'de> Deserialize<'de> for ConnectorStyle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s).unwrap_or_else(|| {
            log::debug!("unknown connector style {s:?}, using solid");
            Self::Solid
        }))
    }
}

/// A directed, styled link between two boxes. Endpoints are derived live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnId,
    pub from_box: BoxId,
    pub to_box: BoxId,
    pub color: String,
    #[serde(default)]
    pub style: ConnectorStyle,
}

impl Connection {
    /// Whether either endpoint is `id`.
    pub fn touches(&self, id: BoxId) -> bool {
        self.from_box == id || self.to_box == id
    }

    /// Whether this connection joins `a` and `b`, in either direction.
    pub fn links(&self, a: BoxId, b: BoxId) -> bool {
        (self.from_box == a && self.to_box == b) || (self.from_box == b && self.to_box == a)
    }
}

/// Why `create_connection` declined. Never shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConnectRejection {
    #[error("box {0} does not exist")]
    MissingBox(BoxId),
    #[error("a box cannot connect to itself")]
    SelfLoop,
    #[error("boxes are already linked by {0}")]
    Duplicate(ConnId),
}

/// What `delete_box` took out of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedBox {
    pub removed: StoryBox,
    /// Connections removed by the cascade.
    pub connections: SmallVec<[ConnId; 4]>,
}

// ─── Document ────────────────────────────────────────────────────────────

/// The persisted unit of work: name, boxes, connections.
#[derive(Debug, Clone, Default)]
pub struct Document {
    name: String,
    boxes: IndexMap<BoxId, StoryBox>,
    connections: IndexMap<ConnId, Connection>,
    /// Adjacency over existing boxes. Holds every connection whose two
    /// endpoints exist; stale connections stay out of it.
    links: UnGraphMap<BoxId, ConnId>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the document. Returns `true` if the name changed.
    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.name == name {
            return false;
        }
        self.name = name;
        true
    }

    /// Boxes in paint order (last is topmost).
    pub fn boxes(&self) -> impl DoubleEndedIterator<Item = &StoryBox> + ExactSizeIterator {
        self.boxes.values()
    }

    pub fn connections(&self) -> impl DoubleEndedIterator<Item = &Connection> + ExactSizeIterator {
        self.connections.values()
    }

    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.connections.is_empty()
    }

    pub fn contains_box(&self, id: BoxId) -> bool {
        self.boxes.contains_key(&id)
    }

    pub fn find_box(&self, id: BoxId) -> Option<&StoryBox> {
        self.boxes.get(&id)
    }

    pub fn find_connection(&self, id: ConnId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Connections with `id` as an endpoint whose other endpoint also exists.
    pub fn incident_connections(&self, id: BoxId) -> SmallVec<[ConnId; 4]> {
        if !self.links.contains_node(id) {
            return SmallVec::new();
        }
        self.links.edges(id).map(|(_, _, conn)| *conn).collect()
    }

    /// The connection joining `a` and `b` in either direction, if any.
    pub fn connection_between(&self, a: BoxId, b: BoxId) -> Option<ConnId> {
        self.links.edge_weight(a, b).copied()
    }

    // ─── Box operations ──────────────────────────────────────────────────

    /// Create a box with a fresh id. Position is clamped to the positive
    /// quadrant and size to the configured minimums.
    pub fn create_box(&mut self, geometry: BoxGeometry, config: &BoardConfig) -> BoxId {
        let id = BoxId::generate(|id| self.box_id_taken(id));
        let (width, height) = config.clamp_size(geometry.width, geometry.height);
        let new_box = StoryBox {
            id,
            x: geometry.x.max(0.0),
            y: geometry.y.max(0.0),
            width,
            height,
            title: String::new(),
            text: String::new(),
            border_color: config.default_border_color.clone(),
        };
        self.boxes.insert(id, new_box);
        self.links.add_node(id);
        id
    }

    /// Insert a fully-formed box (used when loading). Returns `false` and
    /// leaves the document untouched if the id is already present.
    pub fn insert_box(&mut self, story_box: StoryBox) -> bool {
        if self.boxes.contains_key(&story_box.id) {
            return false;
        }
        self.links.add_node(story_box.id);
        self.boxes.insert(story_box.id, story_box);
        true
    }

    /// Remove a box and every connection touching it.
    pub fn delete_box(&mut self, id: BoxId) -> Option<RemovedBox> {
        let removed = self.boxes.shift_remove(&id)?;
        self.links.remove_node(id);

        let mut cascaded = SmallVec::new();
        self.connections.retain(|conn_id, conn| {
            if conn.touches(id) {
                cascaded.push(*conn_id);
                false
            } else {
                true
            }
        });

        Some(RemovedBox {
            removed,
            connections: cascaded,
        })
    }

    /// Apply a geometry patch, clamped to `x, y >= 0` and the minimum size.
    /// Returns `true` if the box exists and its geometry changed.
    pub fn update_box_geometry(
        &mut self,
        id: BoxId,
        patch: GeometryPatch,
        config: &BoardConfig,
    ) -> bool {
        let Some(b) = self.boxes.get_mut(&id) else {
            return false;
        };
        let before = b.geometry();
        if let Some(x) = patch.x {
            b.x = x.max(0.0);
        }
        if let Some(y) = patch.y {
            b.y = y.max(0.0);
        }
        if let Some(width) = patch.width {
            b.width = width.max(config.min_width);
        }
        if let Some(height) = patch.height {
            b.height = height.max(config.min_height);
        }
        b.geometry() != before
    }

    /// Replace the title or body text. Returns `true` if it changed.
    pub fn update_box_text(&mut self, id: BoxId, field: TextField, value: impl Into<String>) -> bool {
        let Some(b) = self.boxes.get_mut(&id) else {
            return false;
        };
        let slot = match field {
            TextField::Title => &mut b.title,
            TextField::Text => &mut b.text,
        };
        let value = value.into();
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    pub fn set_box_color(&mut self, id: BoxId, color: impl Into<String>) -> bool {
        let Some(b) = self.boxes.get_mut(&id) else {
            return false;
        };
        let color = color.into();
        if b.border_color == color {
            return false;
        }
        b.border_color = color;
        true
    }

    // ─── Connection operations ───────────────────────────────────────────

    /// Link two distinct existing boxes that are not linked yet.
    pub fn create_connection(
        &mut self,
        from: BoxId,
        to: BoxId,
        config: &BoardConfig,
    ) -> Result<ConnId, ConnectRejection> {
        for id in [from, to] {
            if !self.boxes.contains_key(&id) {
                return Err(ConnectRejection::MissingBox(id));
            }
        }
        if from == to {
            return Err(ConnectRejection::SelfLoop);
        }
        if let Some(existing) = self.connection_between(from, to) {
            return Err(ConnectRejection::Duplicate(existing));
        }

        let id = ConnId::generate(|id| self.connections.contains_key(&id));
        self.connections.insert(
            id,
            Connection {
                id,
                from_box: from,
                to_box: to,
                color: config.default_connection_color.clone(),
                style: ConnectorStyle::Solid,
            },
        );
        self.links.add_edge(from, to, id);
        Ok(id)
    }

    /// Insert a fully-formed connection (used when loading). Endpoints may be
    /// missing (the connection is kept as a stale reference), but self-loops,
    /// duplicate ids and duplicate pairs are refused.
    pub fn insert_connection(&mut self, conn: Connection) -> Result<(), ConnectRejection> {
        if conn.from_box == conn.to_box {
            return Err(ConnectRejection::SelfLoop);
        }
        if self.connections.contains_key(&conn.id) {
            return Err(ConnectRejection::Duplicate(conn.id));
        }
        let live = self.boxes.contains_key(&conn.from_box) && self.boxes.contains_key(&conn.to_box);
        let existing = if live {
            self.connection_between(conn.from_box, conn.to_box)
        } else {
            // Stale pairs are not indexed.
            self.connections
                .values()
                .find(|c| c.links(conn.from_box, conn.to_box))
                .map(|c| c.id)
        };
        if let Some(existing) = existing {
            return Err(ConnectRejection::Duplicate(existing));
        }
        if live {
            self.links.add_edge(conn.from_box, conn.to_box, conn.id);
        }
        self.connections.insert(conn.id, conn);
        Ok(())
    }

    pub fn delete_connection(&mut self, id: ConnId) -> Option<Connection> {
        let conn = self.connections.shift_remove(&id)?;
        if self.links.edge_weight(conn.from_box, conn.to_box) == Some(&id) {
            self.links.remove_edge(conn.from_box, conn.to_box);
        }
        Some(conn)
    }

    pub fn set_connection_color(&mut self, id: ConnId, color: impl Into<String>) -> bool {
        let Some(conn) = self.connections.get_mut(&id) else {
            return false;
        };
        let color = color.into();
        if conn.color == color {
            return false;
        }
        conn.color = color;
        true
    }

    pub fn set_connection_style(&mut self, id: ConnId, style: ConnectorStyle) -> bool {
        match self.connections.get_mut(&id) {
            Some(conn) if conn.style != style => {
                conn.style = style;
                true
            }
            _ => false,
        }
    }

    // ─── Whole-document operations ───────────────────────────────────────

    /// Substitute the whole document (import).
    pub fn replace_document(&mut self, doc: Document) {
        *self = doc;
    }

    /// Reset to an empty document named after `config.untitled_name`.
    pub fn clear(&mut self, config: &BoardConfig) {
        *self = Document::new(config.untitled_name.clone());
    }

    /// A generated box id must not match a box or a dangling reference,
    /// otherwise a stale connection would silently reattach.
    fn box_id_taken(&self, id: BoxId) -> bool {
        self.boxes.contains_key(&id) || self.connections.values().any(|c| c.touches(id))
    }
}

/// Field-for-field, order-sensitive equality (the adjacency index is derived).
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.boxes.len() == other.boxes.len()
            && self.connections.len() == other.connections.len()
            && self.boxes().eq(other.boxes())
            && self.connections().eq(other.connections())
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let boxes: Vec<&StoryBox> = self.boxes.values().collect();
        let connections: Vec<&Connection> = self.connections.values().collect();
        let mut state = serializer.serialize_struct("Document", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("boxes", &boxes)?;
        state.serialize_field("connections", &connections)?;
        state.end()
    }
}

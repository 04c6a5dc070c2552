pub mod config;
pub mod geometry;
pub mod id;
pub mod model;
pub mod store;

pub use config::BoardConfig;
pub use geometry::{CanvasExtent, ViewTransform, bounding_extent, connector_endpoints};
pub use id::{BoxId, ConnId};
pub use model::*;
pub use store::{
    ExportFile, Gateway, ImportError, MemoryStore, Store, StoreError, export_document,
    export_file_name, import_document,
};

// Re-export kurbo types so downstream crates don't need a direct dependency
pub use kurbo::{Line, Point, Rect, Vec2};

//! Board configuration: size limits, defaults, and persistence settings.
//!
//! Every field has a default so hosts can pass partial JSON overrides.

use serde::{Deserialize, Serialize};

/// Tunables shared by the document model, the gesture layer and the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardConfig {
    /// Smallest width a box settles at after a resize.
    pub min_width: f64,
    /// Smallest height a box settles at after a resize.
    pub min_height: f64,
    /// Size of a freshly created box.
    pub default_width: f64,
    pub default_height: f64,
    /// Border colour of a freshly created box.
    pub default_border_color: String,
    /// Stroke colour of a freshly created connection.
    pub default_connection_color: String,
    /// Margin added past the furthest box corner when sizing the canvas.
    pub canvas_padding: f64,
    /// Passive size changes at or below this many units are ignored.
    pub resize_tolerance: f64,
    /// Side of the square bottom-right resize grip.
    pub resize_handle_size: f64,
    /// Radius around the bottom-centre anchor that counts as the connect handle.
    pub connect_handle_radius: f64,
    /// Key of the single durable-store record.
    pub storage_key: String,
    /// Name given by `clear()`.
    pub untitled_name: String,
    /// Name given to imported documents that carry none.
    pub imported_name: String,
    /// Export file stem used when the document name is empty.
    pub export_fallback_name: String,
    /// Immediate retries after a failed store write.
    pub write_retries: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            min_width: 200.0,
            min_height: 150.0,
            default_width: 200.0,
            default_height: 150.0,
            default_border_color: "#3498db".into(),
            default_connection_color: "#2c3e50".into(),
            canvas_padding: 500.0,
            resize_tolerance: 1.0,
            resize_handle_size: 16.0,
            connect_handle_radius: 10.0,
            storage_key: "storyboard-state".into(),
            untitled_name: "Untitled Storyboard".into(),
            imported_name: "Imported Storyboard".into(),
            export_fallback_name: "storyboard".into(),
            write_retries: 2,
        }
    }
}

impl BoardConfig {
    /// Parse a (possibly partial) JSON override. Missing fields keep defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Clamp a size to the configured minimums.
    pub fn clamp_size(&self, width: f64, height: f64) -> (f64, f64) {
        (width.max(self.min_width), height.max(self.min_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_defaults() {
        let cfg = BoardConfig::from_json(r#"{"minWidth": 120, "storageKey": "alt"}"#).unwrap();
        assert_eq!(cfg.min_width, 120.0);
        assert_eq!(cfg.min_height, 150.0);
        assert_eq!(cfg.storage_key, "alt");
        assert_eq!(cfg.canvas_padding, 500.0);
    }

    #[test]
    fn clamp_size_respects_minimums() {
        let cfg = BoardConfig::default();
        assert_eq!(cfg.clamp_size(10.0, 400.0), (200.0, 400.0));
        assert_eq!(cfg.clamp_size(250.0, -3.0), (250.0, 150.0));
    }
}

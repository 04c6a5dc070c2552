//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s.
//! The shortcut map lives in Rust so every host shares it.

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// New box centred in the visible area.
    AddBox,
    /// Delete the focused box.
    DeleteBox,
    /// Completed by the host (download).
    Export,
    /// Completed by the host (file picker).
    Import,
    ClearAll,
}

/// Resolves key events into shortcut actions.
///
/// Uses platform-aware modifier detection: on macOS `meta` is ⌘,
/// on other platforms `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"n"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(
        key: &str,
        ctrl: bool,
        shift: bool,
        _alt: bool,
        meta: bool,
    ) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                "Backspace" | "Delete" => Some(ShortcutAction::ClearAll),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "s" | "S" => Some(ShortcutAction::Export),
                "o" | "O" => Some(ShortcutAction::Import),
                _ => None,
            };
        }

        // ── Single keys ──
        match key {
            "n" | "N" => Some(ShortcutAction::AddBox),
            "Delete" | "Backspace" => Some(ShortcutAction::DeleteBox),
            _ => None,
        }
    }

    /// Like [`Self::resolve`], but while a text field has focus only ⌘/Ctrl
    /// combos are taken; plain keys belong to the text.
    pub fn resolve_in_text(
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    ) -> Option<ShortcutAction> {
        if ctrl || meta {
            Self::resolve(key, ctrl, shift, alt, meta)
        } else {
            None
        }
    }
}

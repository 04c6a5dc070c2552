pub mod editor;
pub mod gesture;
pub mod hit;
pub mod input;
pub mod persist;
pub mod shortcuts;
pub mod sync;
pub mod view;

pub use editor::Editor;
pub use gesture::{Gesture, GestureEffect, GestureMachine};
pub use input::{BoxPart, InputEvent, PointerTarget};
pub use persist::PersistQueue;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use sync::{Applied, EditMutation, SyncEngine};
pub use view::{RecordingView, ViewCommand, ViewSink};

// Window identity and geometry models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{CONTROL_PANEL_LABEL, NOTE_LABEL_PREFIX};

/// Last-known outer bounds of a window, in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowBounds {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Title (or the reserved control-panel key) to bounds. Ordered so the
/// serialized snapshot is stable across load/save cycles.
pub type WindowLayout = BTreeMap<String, WindowBounds>;

/// Opaque identifier handed out by the window manager at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    ControlPanel,
    Note,
}

impl WindowKind {
    /// Value of the `windowType` query parameter read by the front-end
    pub fn query_name(&self) -> &'static str {
        match self {
            Self::ControlPanel => "CONTROLS",
            Self::Note => "NOTE",
        }
    }
}

/// Toolkit label for a window. Note labels embed the id so a command's
/// calling window can be mapped back to it.
pub fn window_label(kind: WindowKind, id: WindowId) -> String {
    match kind {
        WindowKind::ControlPanel => CONTROL_PANEL_LABEL.to_string(),
        WindowKind::Note => format!("{NOTE_LABEL_PREFIX}{}", id.0),
    }
}

/// Parse a note label back into its id. The control panel label yields None.
pub fn note_id_from_label(label: &str) -> Option<WindowId> {
    label
        .strip_prefix(NOTE_LABEL_PREFIX)
        .and_then(|n| n.parse::<u64>().ok())
        .map(WindowId)
}

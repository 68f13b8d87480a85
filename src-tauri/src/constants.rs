// Names, footprints and tuning values shared across layers

use std::time::Duration;

use crate::models::WindowBounds;

pub const APPLICATION_NAME: &str = "Hoverpad";

/// Directory under the user's home holding everything Hoverpad persists
pub const APP_DIRECTORY_NAME: &str = ".hoverpad";
/// Overrides the root directory when set
pub const ROOT_ENV_VAR: &str = "HOVERPAD_HOME";
pub const NOTES_DIRECTORY_NAME: &str = "notes";
pub const CONFIGURATIONS_DIRECTORY_NAME: &str = "config";
pub const CONFIG_FILENAME: &str = "config.json";
pub const WINDOWS_FILENAME: &str = "windows.json";
pub const NOTE_EXTENSION: &str = "md";

/// Reserved layout key for the control panel
pub const CONTROL_PANEL_ID: &str = "CONTROL_PANEL";
pub const CONTROL_PANEL_LABEL: &str = "control-panel";
pub const NOTE_LABEL_PREFIX: &str = "note-";

/// Coalescing window for layout and config writes
pub const PERSIST_DEBOUNCE: Duration = Duration::from_secs(1);

pub const UNTITLED_PREFIX: &str = "Untitled";
pub const UNTITLED_ATTEMPT_MAX: u32 = 100;

pub const OPACITY_STEP: f64 = 0.1;
pub const OPACITY_FLOOR: f64 = 0.2;
pub const OPACITY_CEILING: f64 = 1.0;

pub const CONTROL_PANEL_CLOSED: WindowBounds = WindowBounds::new(100, 100, 700, 45);
pub const CONTROL_PANEL_OPEN: WindowBounds = WindowBounds::new(100, 100, 700, 500);

pub const NOTE_DEFAULT_WIDTH: u32 = 400;
pub const NOTE_DEFAULT_HEIGHT: u32 = 500;

// Push channels
pub const SEND_TOGGLE_EDIT: &str = "send-toggle-edit";
pub const SEND_NOTES_LIST: &str = "send-notes-list";
pub const SEND_OPACITY: &str = "send-opacity";
pub const SET_OPACITY: &str = "set-opacity";

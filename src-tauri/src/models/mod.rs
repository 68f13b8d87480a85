// Models module for Hoverpad
// Wire-facing fields use camelCase to match the web front-end

pub mod config;
pub mod note;
pub mod window;

pub use config::AppConfig;
pub use note::{NoteContent, NoteDetails, is_valid_title, slugify, title_from_file_stem};
pub use window::{WindowBounds, WindowId, WindowKind, WindowLayout, note_id_from_label, window_label};

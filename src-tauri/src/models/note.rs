// Note listing model
// Titles map to <slug>.md files; the slug is lossy so listings carry display titles

use serde::{Deserialize, Serialize};

/// One entry of the control panel's note list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDetails {
    pub title: String,
    /// File modification time in milliseconds since the Unix epoch
    pub last_modified_time: i64,
    /// True while the note has a live window. Derived, never persisted.
    pub active: bool,
}

impl NoteDetails {
    pub fn new(title: impl Into<String>, last_modified_time: i64) -> Self {
        Self {
            title: title.into(),
            last_modified_time,
            active: false,
        }
    }
}

/// Title plus file content, as returned by a batch read
pub type NoteContent = (String, String);

/// File stem for a title: lower-cased, spaces replaced with hyphens
pub fn slugify(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

/// Display title recovered from a file stem
pub fn title_from_file_stem(stem: &str) -> String {
    stem.replace('-', " ")
}

/// Whether a title can be used as a file stem at all
pub fn is_valid_title(title: &str) -> bool {
    let slug = slugify(title);
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\'])
        && !slug.chars().any(char::is_control)
}

//! Error types shared by the persistence, window and orchestration layers.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HoverpadError {
    /// A filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted snapshot could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// The title cannot be turned into a file name.
    #[error("Invalid title: {0:?}")]
    InvalidTitle(String),

    /// Another note already owns this title's file.
    #[error("Title already in use: {0}")]
    TitleConflict(String),

    /// The calling window could not be mapped to a tracked window.
    #[error("Window not found: {0}")]
    WindowNotFound(String),

    /// The windowing toolkit refused an operation.
    #[error("Window error: {0}")]
    Window(String),
}

pub type Result<T> = std::result::Result<T, HoverpadError>;

impl HoverpadError {
    /// Short message suitable for the save-status indicator.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
            Self::NoteNotFound(title) => format!("Note \"{title}\" no longer exists"),
            Self::InvalidTitle(_) => "Titles cannot be empty or contain slashes".to_string(),
            Self::TitleConflict(title) => format!("A note named \"{title}\" already exists"),
            Self::WindowNotFound(_) => "Could not identify the window".to_string(),
            Self::Window(e) => format!("Window error: {e}"),
        }
    }
}

/// `{success, error?}` result returned by every command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

impl<T> From<Result<T>> for CommandResponse {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::failure(e.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_failure_response() {
        let response: CommandResponse = Err::<(), _>(HoverpadError::NoteNotFound("X".into())).into();
        assert!(!response.success);
        assert!(response.error.unwrap().contains("X"));
    }

    #[test]
    fn test_success_response_omits_error() {
        let json = serde_json::to_string(&CommandResponse::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }
}

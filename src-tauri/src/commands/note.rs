// Note commands

use tauri::{AppHandle, WebviewWindow};
use tracing::info;

use super::{NOT_READY, orchestrator};
use crate::error::CommandResponse;
use crate::models::NoteDetails;

#[tauri::command]
pub async fn createNote(app: AppHandle) -> CommandResponse {
    info!("[createNote] Called");
    let Some(orchestrator) = orchestrator(&app) else {
        return CommandResponse::failure(NOT_READY);
    };
    orchestrator.create_note().await.into()
}

#[tauri::command]
pub async fn openNote(app: AppHandle, title: String) -> CommandResponse {
    info!("[openNote] title: {:?}", title);
    let Some(orchestrator) = orchestrator(&app) else {
        return CommandResponse::failure(NOT_READY);
    };
    orchestrator.open_note(&title).await.into()
}

/// Called by a note window for its own content; the window is resolved from the caller
#[tauri::command]
pub async fn saveNote(
    app: AppHandle,
    window: WebviewWindow,
    title: String,
    previousTitle: String,
    content: String,
) -> CommandResponse {
    info!("[saveNote] {:?} (previous: {:?}) from {}", title, previousTitle, window.label());
    let Some(orchestrator) = orchestrator(&app) else {
        return CommandResponse::failure(NOT_READY);
    };
    let source = orchestrator.resolve_source(window.label());
    orchestrator
        .save_note(source, &title, &previousTitle, &content)
        .await
        .into()
}

#[tauri::command]
pub async fn deleteNote(app: AppHandle, title: String) -> CommandResponse {
    info!("[deleteNote] title: {:?}", title);
    let Some(orchestrator) = orchestrator(&app) else {
        return CommandResponse::failure(NOT_READY);
    };
    orchestrator.delete_note(&title).await.into()
}

#[tauri::command]
pub async fn closeNote(app: AppHandle, title: String) -> CommandResponse {
    info!("[closeNote] title: {:?}", title);
    let Some(orchestrator) = orchestrator(&app) else {
        return CommandResponse::failure(NOT_READY);
    };
    orchestrator.close_note(&title).await.into()
}

/// Reconcile and return the note list (it is also pushed to the control panel)
#[tauri::command]
pub async fn refreshNotes(app: AppHandle) -> Vec<NoteDetails> {
    info!("[refreshNotes] Called");
    match orchestrator(&app) {
        Some(orchestrator) => orchestrator.refresh_window_states().await,
        None => Vec::new(),
    }
}

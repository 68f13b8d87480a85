// Settings commands - opacity and the hide/edit/expand toggles

use tauri::AppHandle;
use tracing::info;

use super::{NOT_READY, orchestrator};
use crate::error::CommandResponse;

#[tauri::command]
pub fn changeOpacity(app: AppHandle, opacity: f64) -> CommandResponse {
    info!("[changeOpacity] opacity: {}", opacity);
    match orchestrator(&app) {
        Some(orchestrator) => {
            orchestrator.change_opacity(opacity);
            CommandResponse::ok()
        }
        None => CommandResponse::failure(NOT_READY),
    }
}

#[tauri::command]
pub fn toggleHide(app: AppHandle) -> CommandResponse {
    info!("[toggleHide] Called");
    match orchestrator(&app) {
        Some(orchestrator) => {
            orchestrator.toggle_hide();
            CommandResponse::ok()
        }
        None => CommandResponse::failure(NOT_READY),
    }
}

#[tauri::command]
pub fn toggleEdit(app: AppHandle) -> CommandResponse {
    info!("[toggleEdit] Called");
    match orchestrator(&app) {
        Some(orchestrator) => {
            orchestrator.toggle_edit();
            CommandResponse::ok()
        }
        None => CommandResponse::failure(NOT_READY),
    }
}

#[tauri::command]
pub fn toggleExpand(app: AppHandle) -> CommandResponse {
    info!("[toggleExpand] Called");
    match orchestrator(&app) {
        Some(orchestrator) => {
            orchestrator.toggle_expand();
            CommandResponse::ok()
        }
        None => CommandResponse::failure(NOT_READY),
    }
}

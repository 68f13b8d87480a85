// Window commands

use tauri::{AppHandle, WebviewWindow};
use tracing::info;

use super::{NOT_READY, orchestrator};
use crate::error::CommandResponse;

/// Close whichever window invoked the command
#[tauri::command]
pub async fn closeWindow(app: AppHandle, window: WebviewWindow) -> CommandResponse {
    info!("[closeWindow] from {}", window.label());
    let Some(orchestrator) = orchestrator(&app) else {
        return CommandResponse::failure(NOT_READY);
    };
    let source = orchestrator.resolve_source(window.label());
    orchestrator.close_window(source).await.into()
}

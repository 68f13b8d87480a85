// Commands module - exports all command handlers
// Submodules must be public for Tauri's generate_handler! macro
// Command names and arguments are camelCase to match the TypeScript-style frontend
#![allow(non_snake_case)]

use std::sync::Arc;
use tauri::{AppHandle, Manager};
use tracing::error;

use crate::orchestrator::Orchestrator;
use crate::windows::tauri_backend::TauriBackend;

pub mod note;
pub mod settings;
pub mod window;

/// Managed application context
pub type AppOrchestrator = Arc<Orchestrator<TauriBackend>>;

/// Owned handle to the orchestrator so async commands don't borrow managed state
pub(crate) fn orchestrator(app: &AppHandle) -> Option<AppOrchestrator> {
    let state = app.try_state::<AppOrchestrator>();
    if state.is_none() {
        error!("[commands] Orchestrator not initialised yet");
    }
    state.map(|s| s.inner().clone())
}

pub(crate) const NOT_READY: &str = "Hoverpad is still starting";

mod commands;
pub mod constants;
pub mod debounce;
pub mod error;
pub mod models;
pub mod orchestrator;
mod shortcuts;
pub mod state;
pub mod storage;
pub mod windows;

use std::sync::Arc;
use tauri::{Manager, RunEvent};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::commands::AppOrchestrator;
use crate::orchestrator::Orchestrator;
use crate::storage::{PersistenceStore, default_root_directory};
use crate::windows::tauri_backend::TauriBackend;

/// `RUST_LOG` wins; otherwise our own crate at info
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hoverpad_lib=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_tracing();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .setup(|app| {
            let runtime = tauri::async_runtime::handle().inner().clone();
            let store = PersistenceStore::new(default_root_directory(), runtime);
            let backend = TauriBackend::new(app.handle().clone());
            let orchestrator: AppOrchestrator = Arc::new(Orchestrator::build(store, backend));
            app.manage(orchestrator.clone());

            shortcuts::register(app.handle());

            tauri::async_runtime::spawn(async move {
                match orchestrator.create_window().await {
                    Ok(()) => info!("[run] Hoverpad ready"),
                    Err(e) => error!("[run] Failed to open the control panel: {}", e),
                }
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Notes
            commands::note::createNote,
            commands::note::openNote,
            commands::note::saveNote,
            commands::note::deleteNote,
            commands::note::closeNote,
            commands::note::refreshNotes,
            // Windows
            commands::window::closeWindow,
            // Settings
            commands::settings::changeOpacity,
            commands::settings::toggleHide,
            commands::settings::toggleEdit,
            commands::settings::toggleExpand,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app, event| {
        if let RunEvent::Exit = event {
            if let Some(orchestrator) = app.try_state::<AppOrchestrator>() {
                let orchestrator = orchestrator.inner().clone();
                tauri::async_runtime::block_on(async move { orchestrator.flush().await });
            }
        }
    });
}

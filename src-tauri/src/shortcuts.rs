// Global keyboard shortcuts
// Bound for the whole session; they stay active while notes are hidden.

use tauri::{AppHandle, Manager};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut, ShortcutState};
use tracing::{error, info};

use crate::commands::AppOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShortcutAction {
    ToggleHide,
    ToggleEdit,
    NewNote,
    IncreaseOpacity,
    DecreaseOpacity,
}

const BINDINGS: [(&str, ShortcutAction); 5] = [
    ("CommandOrControl+H", ShortcutAction::ToggleHide),
    ("CommandOrControl+E", ShortcutAction::ToggleEdit),
    ("CommandOrControl+N", ShortcutAction::NewNote),
    ("CommandOrControl+Shift+Up", ShortcutAction::IncreaseOpacity),
    ("CommandOrControl+Shift+Down", ShortcutAction::DecreaseOpacity),
];

fn perform(app: &AppHandle, action: ShortcutAction) {
    let Some(orchestrator) = app.try_state::<AppOrchestrator>().map(|s| s.inner().clone()) else {
        return;
    };
    info!("[shortcuts] {:?}", action);
    match action {
        ShortcutAction::ToggleHide => orchestrator.toggle_hide(),
        ShortcutAction::ToggleEdit => orchestrator.toggle_edit(),
        ShortcutAction::IncreaseOpacity => {
            orchestrator.increase_opacity();
        }
        ShortcutAction::DecreaseOpacity => {
            orchestrator.decrease_opacity();
        }
        ShortcutAction::NewNote => {
            tauri::async_runtime::spawn(async move {
                if let Err(e) = orchestrator.create_note().await {
                    error!("[shortcuts] New note failed: {}", e);
                }
            });
        }
    }
}

/// Register every binding. A shortcut another app already owns is logged and skipped.
pub fn register(app: &AppHandle) {
    for (accelerator, action) in BINDINGS {
        let shortcut = match accelerator.parse::<Shortcut>() {
            Ok(shortcut) => shortcut,
            Err(e) => {
                error!("[shortcuts] Invalid accelerator {}: {}", accelerator, e);
                continue;
            }
        };
        let result = app.global_shortcut().on_shortcut(shortcut, move |app, _shortcut, event| {
            if event.state() == ShortcutState::Pressed {
                perform(app, action);
            }
        });
        match result {
            Ok(()) => info!("[shortcuts] Registered {}", accelerator),
            Err(e) => error!("[shortcuts] Failed to register {}: {}", accelerator, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_parse() {
        for (accelerator, _) in BINDINGS {
            assert!(accelerator.parse::<Shortcut>().is_ok(), "{accelerator}");
        }
    }
}

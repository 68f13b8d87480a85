// Window layer
// Owns live native windows and pushes configuration onto them. Native handles
// never leave this module; the state registry only ever sees WindowIds.

pub mod tauri_backend;
#[cfg(test)]
pub mod testing;

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

use crate::constants::{
    APPLICATION_NAME, CONTROL_PANEL_CLOSED, CONTROL_PANEL_ID, CONTROL_PANEL_LABEL, CONTROL_PANEL_OPEN,
    NOTE_DEFAULT_HEIGHT, NOTE_DEFAULT_WIDTH, SEND_NOTES_LIST, SEND_OPACITY, SEND_TOGGLE_EDIT,
};
use crate::error::{HoverpadError, Result};
use crate::models::{
    AppConfig, NoteContent, NoteDetails, WindowBounds, WindowId, WindowKind, note_id_from_label, window_label,
};
use crate::state::StateRegistry;

/// Raw events a native window reports back
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeEvent {
    /// Moved or resized; carries the new outer bounds
    Geometry(WindowBounds),
    Destroyed,
}

pub type NativeEventListener = Box<dyn Fn(NativeEvent) + Send + Sync>;

/// Receives `(title or CONTROL_PANEL_ID, bounds)` for every move/resize
pub type GeometryHandler = Arc<dyn Fn(&str, WindowBounds) + Send + Sync>;

/// Everything a backend needs to build a window
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub id: WindowId,
    pub kind: WindowKind,
    pub label: String,
    pub title: String,
    /// None lets the OS pick a position
    pub position: Option<(i32, i32)>,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    /// Query parameters handed to the web view
    pub query: Vec<(&'static str, String)>,
}

/// A live toolkit window. Handles are cheap clones of the same window.
pub trait NativeWindow: Clone + Send + Sync + 'static {
    fn is_destroyed(&self) -> bool;
    fn bounds(&self) -> Option<WindowBounds>;
    fn set_opacity(&self, opacity: f64) -> Result<()>;
    fn set_ignore_mouse_events(&self, ignore: bool) -> Result<()>;
    fn set_resizable(&self, resizable: bool) -> Result<()>;
    fn set_size(&self, width: u32, height: u32) -> Result<()>;
    fn set_title(&self, title: &str) -> Result<()>;
    fn focus(&self) -> Result<()>;
    fn set_always_on_top(&self, always_on_top: bool) -> Result<()>;
    fn close(&self) -> Result<()>;
    fn send<T: Serialize + Clone>(&self, channel: &str, payload: T) -> Result<()>;
}

pub trait WindowBackend: Send + Sync + 'static {
    type Window: NativeWindow;

    fn create_window(&self, spec: WindowSpec, listener: NativeEventListener) -> Result<Self::Window>;
}

fn effective_opacity(config: &AppConfig) -> f64 {
    if config.hidden { 0.0 } else { config.opacity }
}

fn log_failure(operation: &str, result: Result<()>) {
    if let Err(e) = result {
        warn!("[WindowManager] {} failed: {}", operation, e);
    }
}

pub struct WindowManager<B: WindowBackend> {
    backend: B,
    registry: Arc<StateRegistry>,
    next_id: AtomicU64,
    control_panel: Mutex<Option<B::Window>>,
    notes: Mutex<HashMap<WindowId, B::Window>>,
    /// Serializes check-then-create so a title never gets two windows
    creation: Mutex<()>,
}

impl<B: WindowBackend> WindowManager<B> {
    pub fn new(backend: B, registry: Arc<StateRegistry>) -> Self {
        Self {
            backend,
            registry,
            next_id: AtomicU64::new(1),
            control_panel: Mutex::new(None),
            notes: Mutex::new(HashMap::new()),
            creation: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn allocate_id(&self) -> WindowId {
        WindowId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn control_panel_handle(&self) -> Option<B::Window> {
        self.control_panel.lock().clone().filter(|w| !w.is_destroyed())
    }

    fn note_handle(&self, id: WindowId) -> Option<B::Window> {
        self.notes.lock().get(&id).cloned().filter(|w| !w.is_destroyed())
    }

    fn note_handles(&self) -> Vec<B::Window> {
        self.notes
            .lock()
            .values()
            .filter(|w| !w.is_destroyed())
            .cloned()
            .collect()
    }

    /// Control panel first, then every note
    fn all_handles(&self) -> Vec<B::Window> {
        self.control_panel_handle()
            .into_iter()
            .chain(self.note_handles())
            .collect()
    }

    /// Map a toolkit label back to the window that owns it
    pub fn resolve_label(&self, label: &str) -> Option<WindowId> {
        let id = if label == CONTROL_PANEL_LABEL {
            self.registry.control_panel()
        } else {
            note_id_from_label(label)
        };
        if id.is_none() {
            error!("[WindowManager::resolve_label] Unknown window label {:?}", label);
        }
        id
    }

    pub fn bounds_of(&self, id: WindowId) -> Option<WindowBounds> {
        self.note_handle(id).and_then(|w| w.bounds())
    }

    #[cfg(test)]
    pub fn open_note_count(&self) -> usize {
        self.note_handles().len()
    }

    // ============================================
    // CONTROL PANEL
    // ============================================

    pub fn create_control_panel(self: &Arc<Self>, on_geometry: GeometryHandler) -> Result<WindowId> {
        if let (Some(id), Some(existing)) = (self.registry.control_panel(), self.control_panel_handle()) {
            info!("[WindowManager::create_control_panel] Already open, focusing");
            log_failure("focus", existing.focus());
            return Ok(id);
        }

        let config = self.registry.config();
        let saved = self
            .registry
            .geometry_for(CONTROL_PANEL_ID)
            .unwrap_or(CONTROL_PANEL_CLOSED);
        let footprint = if config.expanded { CONTROL_PANEL_OPEN } else { CONTROL_PANEL_CLOSED };

        let id = self.allocate_id();
        let spec = WindowSpec {
            id,
            kind: WindowKind::ControlPanel,
            label: window_label(WindowKind::ControlPanel, id),
            title: APPLICATION_NAME.to_string(),
            position: Some((saved.x, saved.y)),
            width: footprint.width,
            height: footprint.height,
            resizable: false,
            query: vec![
                ("windowType", WindowKind::ControlPanel.query_name().to_string()),
                ("opacity", config.opacity.to_string()),
                ("editable", config.editable.to_string()),
                ("expanded", config.expanded.to_string()),
            ],
        };
        info!("[WindowManager::create_control_panel] {} at ({}, {})", id, saved.x, saved.y);

        let manager: Weak<Self> = Arc::downgrade(self);
        let listener: NativeEventListener = Box::new(move |event: NativeEvent| {
            let Some(manager) = manager.upgrade() else {
                return;
            };
            match event {
                NativeEvent::Geometry(bounds) => on_geometry(CONTROL_PANEL_ID, bounds),
                NativeEvent::Destroyed => manager.teardown(id),
            }
        });

        let window = self.backend.create_window(spec, listener)?;
        *self.control_panel.lock() = Some(window.clone());
        self.registry.set_control_panel(Some(id));
        if let Some(bounds) = window.bounds() {
            self.registry.update_geometry(CONTROL_PANEL_ID, bounds);
        }
        log_failure("set_opacity", window.set_opacity(effective_opacity(&config)));
        log_failure("set_ignore_mouse_events", window.set_ignore_mouse_events(config.hidden));
        Ok(id)
    }

    /// The control panel is the root of the window tree: losing it closes every note.
    /// Geometry entries survive so the arrangement is restored next launch.
    fn teardown(&self, panel: WindowId) {
        if self.registry.control_panel() != Some(panel) {
            debug!("[WindowManager::teardown] {} is not the current control panel", panel);
            return;
        }
        info!("[WindowManager::teardown] Control panel closed, closing all notes");
        self.registry.set_control_panel(None);
        self.control_panel.lock().take();

        let notes: Vec<(WindowId, B::Window)> = self.notes.lock().drain().collect();
        for (id, window) in notes {
            self.registry.forget_window(id);
            if !window.is_destroyed() {
                log_failure("close", window.close());
            }
        }
    }

    // ============================================
    // NOTES
    // ============================================

    /// Open a note window, or focus the existing one for a named title.
    pub fn open_note(
        self: &Arc<Self>,
        title: &str,
        content: &str,
        on_geometry: GeometryHandler,
        bounds: Option<WindowBounds>,
    ) -> Result<WindowId> {
        let _creating = self.creation.lock();
        if let Some(existing) = self.registry.window_for_title(title) {
            if self.note_handle(existing).is_some() {
                warn!("[WindowManager::open_note] {:?} already open in {}", title, existing);
                self.focus_note(title);
                return Ok(existing);
            }
        }

        let config = self.registry.config();
        let id = self.allocate_id();
        let spec = WindowSpec {
            id,
            kind: WindowKind::Note,
            label: window_label(WindowKind::Note, id),
            title: title.to_string(),
            position: bounds.map(|b| (b.x, b.y)),
            width: bounds.map_or(NOTE_DEFAULT_WIDTH, |b| b.width),
            height: bounds.map_or(NOTE_DEFAULT_HEIGHT, |b| b.height),
            resizable: true,
            query: vec![
                ("windowType", WindowKind::Note.query_name().to_string()),
                ("windowId", id.0.to_string()),
                ("editable", config.editable.to_string()),
                ("title", title.to_string()),
                ("content", content.to_string()),
            ],
        };
        info!("[WindowManager::open_note] {:?} as {}", title, id);

        let registry = self.registry.clone();
        let manager: Weak<Self> = Arc::downgrade(self);
        let listener: NativeEventListener = Box::new(move |event: NativeEvent| match event {
            NativeEvent::Geometry(bounds) => match registry.title_for_window(id) {
                Some(title) if !title.is_empty() => on_geometry(&title, bounds),
                Some(_) => {}
                None => debug!("[WindowManager] Geometry event for untracked window {}", id),
            },
            NativeEvent::Destroyed => {
                if let Some(manager) = manager.upgrade() {
                    manager.release_note(id);
                }
            }
        });

        let window = self.backend.create_window(spec, listener)?;
        self.notes.lock().insert(id, window.clone());
        self.registry.register_note_window(id, title, window.bounds());

        log_failure(
            "set_ignore_mouse_events",
            window.set_ignore_mouse_events(config.hidden || !config.editable),
        );
        log_failure("set_opacity", window.set_opacity(effective_opacity(&config)));
        Ok(id)
    }

    /// A note window went away underneath us
    fn release_note(&self, id: WindowId) {
        if self.notes.lock().remove(&id).is_some() {
            debug!("[WindowManager::release_note] {}", id);
        }
        self.registry.forget_window(id);
    }

    /// Reopen a saved arrangement. Returns how many windows were opened.
    pub fn open_window_arrangement(
        self: &Arc<Self>,
        notes: Vec<Option<NoteContent>>,
        on_geometry: GeometryHandler,
    ) -> usize {
        let mut opened = 0;
        for (title, content) in notes.into_iter().flatten() {
            if self.check_note_open(&title) {
                continue;
            }
            let bounds = self.registry.geometry_for(&title);
            match self.open_note(&title, &content, on_geometry.clone(), bounds) {
                Ok(_) => opened += 1,
                Err(e) => error!("[WindowManager::open_window_arrangement] {:?}: {}", title, e),
            }
        }
        info!("[WindowManager::open_window_arrangement] Opened {} windows", opened);
        opened
    }

    pub fn check_note_open(&self, title: &str) -> bool {
        self.registry
            .window_for_title(title)
            .and_then(|id| self.note_handle(id))
            .is_some()
    }

    /// Bring an open note to the front and pin it on top
    pub fn focus_note(&self, title: &str) -> bool {
        let Some(window) = self.registry.window_for_title(title).and_then(|id| self.note_handle(id)) else {
            return false;
        };
        log_failure("focus", window.focus());
        log_failure("set_always_on_top", window.set_always_on_top(true));
        true
    }

    /// Close the window a command came from. Returns the note title it held, if any.
    pub fn close_window(&self, source: WindowId) -> Result<Option<String>> {
        if self.registry.control_panel() == Some(source) {
            if let Some(panel) = self.control_panel_handle() {
                panel.close()?;
            }
            self.teardown(source);
            return Ok(None);
        }

        let window = self.notes.lock().remove(&source);
        let title = self.registry.forget_window(source);
        match window {
            Some(window) => {
                if !window.is_destroyed() {
                    window.close()?;
                }
                Ok(title)
            }
            None => Err(HoverpadError::WindowNotFound(source.to_string())),
        }
    }

    /// Close a note by title. False when no window is open for it.
    pub fn close_note_window(&self, title: &str) -> bool {
        let Some(id) = self.registry.window_for_title(title) else {
            debug!("[WindowManager::close_note_window] {:?} is not open", title);
            return false;
        };
        let window = self.notes.lock().remove(&id);
        self.registry.forget_window(id);
        if let Some(window) = window.filter(|w| !w.is_destroyed()) {
            log_failure("close", window.close());
        }
        true
    }

    pub fn update_note_title(&self, source: WindowId, title: &str) {
        match self.note_handle(source) {
            Some(window) => log_failure("set_title", window.set_title(title)),
            None => warn!("[WindowManager::update_note_title] No live window {}", source),
        }
    }

    // ============================================
    // CONFIGURATION EFFECTS
    // ============================================

    fn apply_opacity(&self, opacity: f64) {
        for window in self.all_handles() {
            log_failure("set_opacity", window.set_opacity(opacity));
        }
    }

    fn apply_click_through(&self, notes_ignore: bool, panel_ignore: bool) {
        if let Some(panel) = self.control_panel_handle() {
            log_failure("set_ignore_mouse_events", panel.set_ignore_mouse_events(panel_ignore));
        }
        for window in self.note_handles() {
            log_failure("set_ignore_mouse_events", window.set_ignore_mouse_events(notes_ignore));
        }
    }

    pub fn update_opacity(&self) {
        let config = self.registry.config();
        if !(0.0..=1.0).contains(&config.opacity) || self.control_panel_handle().is_none() {
            return;
        }
        if config.hidden {
            debug!("[WindowManager::update_opacity] Hidden, deferring until shown");
            return;
        }
        self.apply_opacity(config.opacity);
    }

    pub fn update_hide(&self) {
        let config = self.registry.config();
        info!("[WindowManager::update_hide] hidden: {}", config.hidden);
        if config.hidden {
            self.apply_opacity(0.0);
            self.apply_click_through(true, true);
        } else {
            self.apply_opacity(config.opacity);
            self.apply_click_through(!config.editable, false);
        }
    }

    pub fn update_edit(&self) {
        let Some(panel) = self.control_panel_handle() else {
            return;
        };
        let config = self.registry.config();
        info!("[WindowManager::update_edit] editable: {}", config.editable);

        log_failure("send", panel.send(SEND_TOGGLE_EDIT, config.editable));
        for window in self.note_handles() {
            log_failure("send", window.send(SEND_TOGGLE_EDIT, config.editable));
        }
        if !config.hidden {
            self.apply_click_through(!config.editable, false);
        }
    }

    /// Resize the control panel between its footprints. Windows are fixed-size,
    /// so resizing is enabled only around set_size.
    pub fn update_expand(&self) {
        let Some(panel) = self.control_panel_handle() else {
            return;
        };
        let expanded = self.registry.config().expanded;
        let footprint = if expanded { CONTROL_PANEL_OPEN } else { CONTROL_PANEL_CLOSED };
        info!("[WindowManager::update_expand] expanded: {}", expanded);

        log_failure("set_resizable", panel.set_resizable(true));
        log_failure("set_size", panel.set_size(footprint.width, footprint.height));
        log_failure("set_resizable", panel.set_resizable(false));
    }

    pub fn update_control_panel(&self, notes: &[NoteDetails]) {
        if let Some(panel) = self.control_panel_handle() {
            log_failure("send", panel.send(SEND_NOTES_LIST, notes.to_vec()));
        }
    }

    pub fn broadcast_opacity(&self, opacity: f64) {
        if let Some(panel) = self.control_panel_handle() {
            log_failure("send", panel.send(SEND_OPACITY, opacity));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeBackend;
    use super::*;

    fn manager() -> (Arc<StateRegistry>, Arc<WindowManager<FakeBackend>>) {
        let registry = Arc::new(StateRegistry::new());
        let manager = Arc::new(WindowManager::new(FakeBackend::default(), registry.clone()));
        (registry, manager)
    }

    fn recording_handler() -> (GeometryHandler, Arc<Mutex<Vec<(String, WindowBounds)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: GeometryHandler = Arc::new(move |key: &str, bounds: WindowBounds| sink.lock().push((key.to_string(), bounds)));
        (handler, seen)
    }

    #[test]
    fn test_open_note_registers_and_positions() {
        let (registry, manager) = manager();
        let (handler, _) = recording_handler();
        let bounds = WindowBounds::new(10, 20, 300, 400);

        let id = manager.open_note("A", "text", handler, Some(bounds)).unwrap();

        assert_eq!(registry.window_for_title("A"), Some(id));
        assert_eq!(registry.geometry_for("A"), Some(bounds));
        let window = manager.backend().window(id).unwrap();
        assert_eq!(window.bounds(), Some(bounds));
        assert_eq!(window.query("content").as_deref(), Some("text"));
    }

    #[test]
    fn test_open_note_without_bounds_uses_default_size() {
        let (_registry, manager) = manager();
        let (handler, _) = recording_handler();
        let id = manager.open_note("A", "", handler, None).unwrap();

        let spec = manager.backend().spec(id).unwrap();
        assert_eq!(spec.position, None);
        assert_eq!((spec.width, spec.height), (NOTE_DEFAULT_WIDTH, NOTE_DEFAULT_HEIGHT));
    }

    #[test]
    fn test_open_same_title_twice_focuses() {
        let (_registry, manager) = manager();
        let (handler, _) = recording_handler();
        let first = manager.open_note("X", "", handler.clone(), None).unwrap();
        let second = manager.open_note("X", "", handler, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(manager.open_note_count(), 1);
        let state = manager.backend().window(first).unwrap().state();
        assert!(state.focused);
        assert!(state.calls.iter().any(|c| c == "set_always_on_top(true)"));
    }

    #[test]
    fn test_geometry_events_report_current_title() {
        let (registry, manager) = manager();
        let (handler, seen) = recording_handler();
        let id = manager.open_note("Old", "", handler, None).unwrap();
        registry.record_window_for_title(id, "New", "Old", None);

        let moved = WindowBounds::new(1, 2, 3, 4);
        manager.backend().window(id).unwrap().emit(NativeEvent::Geometry(moved));
        assert_eq!(*seen.lock(), vec![("New".to_string(), moved)]);
    }

    #[test]
    fn test_control_panel_close_tears_down_notes() {
        let (registry, manager) = manager();
        let (handler, _) = recording_handler();
        let panel = manager.create_control_panel(handler.clone()).unwrap();
        let a = manager.open_note("A", "", handler.clone(), Some(WindowBounds::new(1, 1, 10, 10))).unwrap();
        let b = manager.open_note("B", "", handler, None).unwrap();

        manager.close_window(panel).unwrap();

        assert_eq!(registry.control_panel(), None);
        assert!(manager.backend().window(a).unwrap().is_destroyed());
        assert!(manager.backend().window(b).unwrap().is_destroyed());
        assert_eq!(manager.open_note_count(), 0);
        assert!(registry.note_windows().is_empty());
        assert!(registry.geometry_for("A").is_some());
    }

    #[test]
    fn test_native_destroy_of_panel_cascades() {
        let (registry, manager) = manager();
        let (handler, _) = recording_handler();
        let panel = manager.create_control_panel(handler.clone()).unwrap();
        let a = manager.open_note("A", "", handler, None).unwrap();

        manager.backend().window(panel).unwrap().close().unwrap();

        assert!(manager.backend().window(a).unwrap().is_destroyed());
        assert_eq!(registry.window_for_title("A"), None);
    }

    #[test]
    fn test_close_window_for_unknown_source_fails() {
        let (_registry, manager) = manager();
        assert!(matches!(
            manager.close_window(WindowId(77)),
            Err(HoverpadError::WindowNotFound(_))
        ));
    }

    #[test]
    fn test_update_expand_toggles_resizable_around_resize() {
        let (registry, manager) = manager();
        let (handler, _) = recording_handler();
        let panel = manager.create_control_panel(handler).unwrap();
        registry.toggle_expanded();

        manager.update_expand();

        let window = manager.backend().window(panel).unwrap();
        let calls = window.state().calls.clone();
        let tail: Vec<&str> = calls.iter().rev().take(3).rev().map(String::as_str).collect();
        assert_eq!(tail, vec!["set_resizable(true)", "set_size(700x500)", "set_resizable(false)"]);
        assert!(!window.state().resizable);
    }

    #[test]
    fn test_hide_and_show_restore_stored_values() {
        let (registry, manager) = manager();
        let (handler, _) = recording_handler();
        manager.create_control_panel(handler.clone()).unwrap();
        let note = manager.open_note("A", "", handler, None).unwrap();
        registry.set_opacity(0.6);

        registry.toggle_hidden();
        manager.update_hide();
        let window = manager.backend().window(note).unwrap();
        assert_eq!(window.state().opacity, 0.0);
        assert!(window.state().ignore_mouse_events);

        registry.toggle_hidden();
        manager.update_hide();
        assert_eq!(window.state().opacity, 0.6);
        assert!(!window.state().ignore_mouse_events);
    }

    #[test]
    fn test_destroyed_windows_are_skipped() {
        let (registry, manager) = manager();
        let (handler, _) = recording_handler();
        manager.create_control_panel(handler.clone()).unwrap();
        let note = manager.open_note("A", "", handler, None).unwrap();
        let window = manager.backend().window(note).unwrap();
        window.mark_destroyed_silently();

        registry.set_opacity(0.5);
        manager.update_opacity();
        assert_eq!(window.state().opacity, 1.0);
        assert!(!manager.check_note_open("A"));
    }

    #[test]
    fn test_resolve_label() {
        let (_registry, manager) = manager();
        let (handler, _) = recording_handler();
        let panel = manager.create_control_panel(handler.clone()).unwrap();
        let note = manager.open_note("A", "", handler, None).unwrap();

        assert_eq!(manager.resolve_label(CONTROL_PANEL_LABEL), Some(panel));
        assert_eq!(manager.resolve_label(&window_label(WindowKind::Note, note)), Some(note));
        assert_eq!(manager.resolve_label("elsewhere"), None);
    }
}

// In-memory application state
// Window <-> title bijection, per-title geometry, known titles and configuration.
// Every miss degrades to a safe default; nothing here performs I/O.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::constants::{UNTITLED_ATTEMPT_MAX, UNTITLED_PREFIX};
use crate::models::{AppConfig, NoteDetails, WindowBounds, WindowId, WindowLayout, slugify};

/// Titles keyed by file slug, since two titles with the same slug share a file
#[derive(Debug, Default)]
struct KnownTitles(HashMap<String, String>);

impl KnownTitles {
    fn insert(&mut self, title: &str) {
        if !title.is_empty() {
            self.0.insert(slugify(title), title.to_string());
        }
    }

    fn remove(&mut self, title: &str) {
        self.0.remove(&slugify(title));
    }

    fn contains(&self, title: &str) -> bool {
        self.0.contains_key(&slugify(title))
    }

    fn display_for_slug(&self, slug: &str) -> Option<&str> {
        self.0.get(slug).map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    control_panel: Option<WindowId>,
    /// Named, open note windows only
    title_to_window: HashMap<String, WindowId>,
    /// Every open note window, including unnamed ones (empty title)
    window_to_title: HashMap<WindowId, String>,
    /// Outlives windows; the source of the layout snapshot
    windows: WindowLayout,
    titles: KnownTitles,
    config: AppConfig,
}

impl RegistryState {
    /// Drop `title -> id` only when it still points at `id`
    fn unmap_title(&mut self, title: &str, id: WindowId) {
        match self.title_to_window.get(title) {
            Some(owner) if *owner == id => {
                self.title_to_window.remove(title);
            }
            Some(owner) => {
                warn!("[StateRegistry] {:?} belongs to {} not {}, keeping it", title, owner, id);
            }
            None => {}
        }
    }
}

#[derive(Debug, Default)]
pub struct StateRegistry {
    state: Mutex<RegistryState>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================
    // CONFIGURATION
    // ============================================

    pub fn config(&self) -> AppConfig {
        self.state.lock().config
    }

    /// Replace the configuration. A replaced config never starts hidden.
    pub fn set_config(&self, config: AppConfig) {
        info!("[StateRegistry::set_config] {:?}", config);
        let mut state = self.state.lock();
        state.config = AppConfig {
            hidden: false,
            opacity: config.opacity.clamp(0.0, 1.0),
            ..config
        };
    }

    pub fn set_opacity(&self, opacity: f64) {
        self.state.lock().config.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn toggle_hidden(&self) -> bool {
        let mut state = self.state.lock();
        state.config.hidden = !state.config.hidden;
        state.config.hidden
    }

    pub fn toggle_editable(&self) -> bool {
        let mut state = self.state.lock();
        state.config.editable = !state.config.editable;
        state.config.editable
    }

    pub fn toggle_expanded(&self) -> bool {
        let mut state = self.state.lock();
        state.config.expanded = !state.config.expanded;
        state.config.expanded
    }

    // ============================================
    // KNOWN TITLES
    // ============================================

    pub fn save_titles<I, S>(&self, titles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.state.lock();
        for title in titles {
            state.titles.insert(title.as_ref());
        }
    }

    #[cfg(test)]
    pub fn contains_title(&self, title: &str) -> bool {
        self.state.lock().titles.contains(title)
    }

    /// Smallest unused `Untitled N` (N < 100), reserved before returning so
    /// back-to-back allocations never collide. Empty once exhausted.
    pub fn allocate_default_title(&self) -> String {
        let mut state = self.state.lock();
        for n in 1..UNTITLED_ATTEMPT_MAX {
            let candidate = format!("{UNTITLED_PREFIX} {n}");
            if !state.titles.contains(&candidate) {
                state.titles.insert(&candidate);
                debug!("[StateRegistry::allocate_default_title] {}", candidate);
                return candidate;
            }
        }
        warn!("[StateRegistry::allocate_default_title] Default titles exhausted");
        String::new()
    }

    /// Whether naming window `id` as `title` would take over another note's file
    pub fn title_conflicts(&self, id: WindowId, title: &str, previous_title: &str) -> bool {
        if slugify(title) == slugify(previous_title) {
            return false;
        }
        let state = self.state.lock();
        if state.title_to_window.get(title) == Some(&id) {
            return false;
        }
        state.titles.contains(title)
    }

    pub fn delete_title(&self, title: &str) {
        self.state.lock().titles.remove(title);
    }

    // ============================================
    // WINDOW <-> TITLE
    // ============================================

    pub fn set_control_panel(&self, id: Option<WindowId>) {
        self.state.lock().control_panel = id;
    }

    pub fn control_panel(&self) -> Option<WindowId> {
        self.state.lock().control_panel
    }

    /// Track a freshly created note window
    pub fn register_note_window(&self, id: WindowId, title: &str, bounds: Option<WindowBounds>) {
        let mut state = self.state.lock();
        state.window_to_title.insert(id, title.to_string());
        if title.is_empty() {
            return;
        }
        if let Some(stale) = state.title_to_window.insert(title.to_string(), id) {
            if stale != id {
                warn!("[StateRegistry::register_note_window] {:?} moved from {} to {}", title, stale, id);
                state.window_to_title.remove(&stale);
            }
        }
        state.titles.insert(title);
        if let Some(bounds) = bounds {
            state.windows.insert(title.to_string(), bounds);
        }
    }

    /// Name (or rename) the note shown in window `id`. Returns false, and changes
    /// nothing, when `id` is not a tracked note window.
    pub fn record_window_for_title(
        &self,
        id: WindowId,
        title: &str,
        previous_title: &str,
        bounds: Option<WindowBounds>,
    ) -> bool {
        let mut state = self.state.lock();
        let Some(current) = state.window_to_title.get(&id).cloned() else {
            error!("[StateRegistry::record_window_for_title] No live window {} for {:?}", id, title);
            return false;
        };

        if !previous_title.is_empty() && previous_title != title {
            state.windows.remove(previous_title);
            state.unmap_title(previous_title, id);
            state.titles.remove(previous_title);
        }
        if !current.is_empty() && current != title && current != previous_title {
            state.windows.remove(&current);
            state.unmap_title(&current, id);
        }

        state.window_to_title.insert(id, title.to_string());
        if !title.is_empty() {
            state.title_to_window.insert(title.to_string(), id);
            state.titles.insert(title);
            if let Some(bounds) = bounds {
                state.windows.insert(title.to_string(), bounds);
            }
        }
        true
    }

    /// Stop tracking window `id` in both directions. Geometry is kept.
    pub fn forget_window(&self, id: WindowId) -> Option<String> {
        let mut state = self.state.lock();
        let title = state.window_to_title.remove(&id)?;
        if !title.is_empty() {
            state.unmap_title(&title, id);
        }
        Some(title)
    }

    pub fn window_for_title(&self, title: &str) -> Option<WindowId> {
        if title.is_empty() {
            return None;
        }
        self.state.lock().title_to_window.get(title).copied()
    }

    /// Reverse lookup without logging
    pub fn title_for_window(&self, id: WindowId) -> Option<String> {
        self.state.lock().window_to_title.get(&id).cloned()
    }

    /// Reverse lookup for an event source. Empty when the window is unknown.
    pub fn resolve_title_for_window(&self, id: WindowId) -> String {
        self.title_for_window(id).unwrap_or_else(|| {
            error!("[StateRegistry::resolve_title_for_window] Unknown window {}", id);
            String::new()
        })
    }

    pub fn is_note_window(&self, id: WindowId) -> bool {
        self.state.lock().window_to_title.contains_key(&id)
    }

    #[cfg(test)]
    pub fn note_windows(&self) -> Vec<WindowId> {
        self.state.lock().window_to_title.keys().copied().collect()
    }

    // ============================================
    // GEOMETRY
    // ============================================

    /// Called for every move/resize event
    pub fn update_geometry(&self, key: &str, bounds: WindowBounds) {
        self.state.lock().windows.insert(key.to_string(), bounds);
    }

    pub fn geometry_for(&self, key: &str) -> Option<WindowBounds> {
        self.state.lock().windows.get(key).copied()
    }

    /// Drop a title's geometry entry. Missing entries are fine.
    pub fn remove_window_for_title(&self, title: &str) {
        self.state.lock().windows.remove(title);
    }

    pub fn snapshot_geometry(&self) -> WindowLayout {
        self.state.lock().windows.clone()
    }

    pub fn replace_geometry(&self, layout: WindowLayout) {
        self.state.lock().windows = layout;
    }

    // ============================================
    // DERIVED
    // ============================================

    /// Mark notes with a live window active and give each its display title.
    /// Listings come from file names, so matching is done on slugs.
    pub fn compute_active_flags(&self, notes: Vec<NoteDetails>) -> Vec<NoteDetails> {
        let state = self.state.lock();
        let live: HashMap<String, &str> = state
            .title_to_window
            .keys()
            .map(|title| (slugify(title), title.as_str()))
            .collect();

        notes
            .into_iter()
            .map(|note| {
                let slug = slugify(&note.title);
                if let Some(title) = live.get(&slug) {
                    NoteDetails {
                        title: title.to_string(),
                        active: true,
                        ..note
                    }
                } else {
                    let title = state
                        .titles
                        .display_for_slug(&slug)
                        .map(str::to_string)
                        .unwrap_or(note.title);
                    NoteDetails {
                        title,
                        active: false,
                        ..note
                    }
                }
            })
            .collect()
    }
}

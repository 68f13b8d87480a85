// Orchestrator
// Sequences every command across persistence, state and windows. This is the only
// place multi-step consistency is enforced.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::constants::{CONTROL_PANEL_ID, OPACITY_CEILING, OPACITY_FLOOR, OPACITY_STEP};
use crate::error::{HoverpadError, Result};
use crate::models::{NoteDetails, WindowBounds, WindowId, is_valid_title};
use crate::state::StateRegistry;
use crate::storage::{LayoutSource, PersistenceStore};
use crate::windows::{GeometryHandler, WindowBackend, WindowManager};

/// Next keyboard-driven opacity value, on the 0.1 grid and inside the shortcut range
fn step_opacity(current: f64, delta: f64) -> f64 {
    let stepped = ((current + delta) / OPACITY_STEP).round() * OPACITY_STEP;
    stepped.clamp(OPACITY_FLOOR, OPACITY_CEILING)
}

pub struct Orchestrator<B: WindowBackend> {
    store: Arc<PersistenceStore>,
    registry: Arc<StateRegistry>,
    windows: Arc<WindowManager<B>>,
    /// Snapshot of the registry's geometry, taken when a layout write fires
    layout_source: LayoutSource,
}

impl<B: WindowBackend> Orchestrator<B> {
    pub fn build(store: PersistenceStore, backend: B) -> Self {
        let store = Arc::new(store);
        let registry = Arc::new(StateRegistry::new());
        let windows = Arc::new(WindowManager::new(backend, registry.clone()));
        let snapshot = registry.clone();
        let layout_source: LayoutSource = Arc::new(move || snapshot.snapshot_geometry());
        Self {
            store,
            registry,
            windows,
            layout_source,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &PersistenceStore {
        &self.store
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    pub fn windows(&self) -> &Arc<WindowManager<B>> {
        &self.windows
    }

    /// Window id behind a toolkit label, for commands that act on their caller
    pub fn resolve_source(&self, label: &str) -> Option<WindowId> {
        self.windows.resolve_label(label)
    }

    /// Move/resize sink: apply in memory now, persist on the trailing edge
    fn geometry_handler(&self) -> GeometryHandler {
        let registry = self.registry.clone();
        let store = self.store.clone();
        let layout_source = self.layout_source.clone();
        Arc::new(move |key: &str, bounds: WindowBounds| {
            debug!("[Orchestrator] Geometry {:?} -> {:?}", key, bounds);
            registry.update_geometry(key, bounds);
            store.schedule_window_layout_save(layout_source.clone());
        })
    }

    // ============================================
    // STARTUP
    // ============================================

    /// Seed known titles from disk so default names never collide with existing files
    pub async fn initialise_state(&self) {
        let notes = self.store.list_notes().await;
        info!("[Orchestrator::initialise_state] {} notes on disk", notes.len());
        self.registry.save_titles(notes.into_iter().map(|n| n.title));
    }

    /// Restore the control panel and the saved arrangement
    pub async fn create_window(&self) -> Result<()> {
        let (config, layout) = tokio::join!(self.store.load_config(), self.store.load_window_layout());
        self.registry.set_config(config);
        self.registry.replace_geometry(layout);
        self.initialise_state().await;

        let titles: Vec<String> = self
            .registry
            .snapshot_geometry()
            .into_keys()
            .filter(|key| key != CONTROL_PANEL_ID)
            .collect();
        let batch = self.store.read_note_content_batch(&titles).await;
        for (title, content) in titles.iter().zip(&batch) {
            if content.is_none() {
                warn!("[Orchestrator::create_window] Dropping layout entry for missing note {:?}", title);
                self.registry.remove_window_for_title(title);
            }
        }

        let on_geometry = self.geometry_handler();
        self.windows.create_control_panel(on_geometry.clone())?;
        self.windows.open_window_arrangement(batch, on_geometry);
        self.refresh_window_states().await;
        Ok(())
    }

    // ============================================
    // NOTES
    // ============================================

    pub async fn create_note(&self) -> Result<()> {
        let title = self.registry.allocate_default_title();
        info!("[Orchestrator::create_note] {:?}", title);

        self.windows.open_note(&title, "", self.geometry_handler(), None)?;
        let written = if title.is_empty() {
            Ok(())
        } else {
            self.store.write_note(&title, "", "").await
        };
        self.refresh_window_states().await;
        written
    }

    pub async fn open_note(&self, title: &str) -> Result<()> {
        info!("[Orchestrator::open_note] {:?}", title);
        let content = self.store.read_note_content(title).await?;

        if !self.windows.focus_note(title) {
            let bounds = self.registry.geometry_for(title);
            self.windows.open_note(title, &content, self.geometry_handler(), bounds)?;
        }
        self.refresh_window_states().await;
        Ok(())
    }

    /// Persist a note's content, renaming it when `title` differs from `previous_title`
    pub async fn save_note(
        &self,
        source: Option<WindowId>,
        title: &str,
        previous_title: &str,
        content: &str,
    ) -> Result<()> {
        if title.is_empty() {
            warn!("[Orchestrator::save_note] Ignoring save without a title");
            return Ok(());
        }
        if !is_valid_title(title) {
            return Err(HoverpadError::InvalidTitle(title.to_string()));
        }
        let source = source
            .filter(|id| self.registry.is_note_window(*id))
            .ok_or_else(|| HoverpadError::WindowNotFound(format!("note {:?}", title)))?;

        // The window's own title wins over a stale previous title from the page,
        // e.g. after the title field was cleared and retyped.
        let current = self.registry.resolve_title_for_window(source);
        let previous_title = if current.is_empty() || current == previous_title {
            previous_title.to_string()
        } else {
            debug!(
                "[Orchestrator::save_note] {} reports previous {:?} but holds {:?}",
                source, previous_title, current
            );
            current
        };
        if self.registry.title_conflicts(source, title, &previous_title) {
            return Err(HoverpadError::TitleConflict(title.to_string()));
        }

        debug!("[Orchestrator::save_note] {} {:?} -> {:?}", source, previous_title, title);
        self.windows.update_note_title(source, title);
        let bounds = self.windows.bounds_of(source);
        if !self.registry.record_window_for_title(source, title, &previous_title, bounds) {
            error!("[Orchestrator::save_note] {} vanished before {:?} was recorded", source, title);
        }
        let written = self.store.write_note(title, &previous_title, content).await;
        self.refresh_window_states().await;
        written
    }

    /// Close the window first so no window outlives its file
    pub async fn delete_note(&self, title: &str) -> Result<()> {
        info!("[Orchestrator::delete_note] {:?}", title);
        self.registry.remove_window_for_title(title);
        self.windows.close_note_window(title);
        self.registry.delete_title(title);
        let deleted = self.store.delete_note(title).await;
        self.refresh_window_states().await;
        deleted
    }

    /// Close a note's window without touching its file. Its geometry is kept for the next open.
    pub async fn close_note(&self, title: &str) -> Result<()> {
        info!("[Orchestrator::close_note] {:?}", title);
        if !self.windows.close_note_window(title) {
            return Err(HoverpadError::WindowNotFound(format!("note {:?}", title)));
        }
        self.refresh_window_states().await;
        Ok(())
    }

    /// Close the window a command came from. Closing the control panel closes everything.
    pub async fn close_window(&self, source: Option<WindowId>) -> Result<()> {
        let source = source.ok_or_else(|| HoverpadError::WindowNotFound("calling window".to_string()))?;
        info!("[Orchestrator::close_window] {}", source);

        if let Some(title) = self.windows.close_window(source)? {
            debug!("[Orchestrator::close_window] Closed {:?}", title);
        }
        self.refresh_window_states().await;
        Ok(())
    }

    /// Persist layout, re-list notes and push the list to the control panel
    pub async fn refresh_window_states(&self) -> Vec<NoteDetails> {
        self.store.schedule_window_layout_save(self.layout_source.clone());
        let notes = self.store.list_notes().await;
        let notes = self.registry.compute_active_flags(notes);
        self.windows.update_control_panel(&notes);
        notes
    }

    // ============================================
    // CONFIGURATION
    // ============================================

    pub fn change_opacity(&self, opacity: f64) {
        self.registry.set_opacity(opacity);
        self.windows.update_opacity();
        self.store.schedule_config_save(self.registry.config());
    }

    pub fn toggle_hide(&self) {
        let hidden = self.registry.toggle_hidden();
        debug!("[Orchestrator::toggle_hide] hidden: {}", hidden);
        self.windows.update_hide();
        self.store.schedule_config_save(self.registry.config());
    }

    pub fn toggle_edit(&self) {
        let editable = self.registry.toggle_editable();
        debug!("[Orchestrator::toggle_edit] editable: {}", editable);
        self.windows.update_edit();
        self.store.schedule_config_save(self.registry.config());
    }

    pub fn toggle_expand(&self) {
        let expanded = self.registry.toggle_expanded();
        debug!("[Orchestrator::toggle_expand] expanded: {}", expanded);
        self.windows.update_expand();
        self.store.schedule_config_save(self.registry.config());
    }

    pub fn increase_opacity(&self) -> f64 {
        self.shift_opacity(OPACITY_STEP)
    }

    pub fn decrease_opacity(&self) -> f64 {
        self.shift_opacity(-OPACITY_STEP)
    }

    fn shift_opacity(&self, delta: f64) -> f64 {
        let opacity = step_opacity(self.registry.config().opacity, delta);
        self.change_opacity(opacity);
        self.windows.broadcast_opacity(opacity);
        opacity
    }

    /// Write pending config and layout snapshots now
    pub async fn flush(&self) {
        info!("[Orchestrator::flush] Flushing pending writes");
        self.store.flush().await;
    }
}

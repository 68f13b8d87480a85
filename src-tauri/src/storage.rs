// Filesystem persistence for Hoverpad
// Notes are plain Markdown files; configuration and window layout are JSON snapshots

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::constants::{
    APP_DIRECTORY_NAME, CONFIG_FILENAME, CONFIGURATIONS_DIRECTORY_NAME, CONTROL_PANEL_CLOSED,
    CONTROL_PANEL_ID, NOTE_EXTENSION, NOTES_DIRECTORY_NAME, PERSIST_DEBOUNCE, ROOT_ENV_VAR,
    WINDOWS_FILENAME,
};
use crate::debounce::Debouncer;
use crate::error::{HoverpadError, Result};
use crate::models::{
    AppConfig, NoteContent, NoteDetails, WindowLayout, is_valid_title, slugify, title_from_file_stem,
};

// ============================================
// PATH HELPERS
// ============================================

/// Root directory (~/.hoverpad/ unless HOVERPAD_HOME is set)
pub fn default_root_directory() -> PathBuf {
    if let Some(root) = std::env::var_os(ROOT_ENV_VAR).filter(|v| !v.is_empty()) {
        return PathBuf::from(root);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIRECTORY_NAME)
}

/// Layout used when windows.json is missing or unreadable
pub fn default_window_layout() -> WindowLayout {
    WindowLayout::from([(CONTROL_PANEL_ID.to_string(), CONTROL_PANEL_CLOSED)])
}

async fn ensure_dir(dir: &Path) {
    if let Err(e) = fs::create_dir_all(dir).await {
        warn!("[ensure_dir] Could not create {:?}: {}", dir, e);
    }
}

/// Serialize to a sibling temp file then rename over the target
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string(value)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json).await?;
    fs::rename(&staging, path).await?;
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("[remove_if_exists] Already gone: {:?}", path);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================
// STORE
// ============================================

/// Produces the layout to write. Called once per flush, not once per event.
pub type LayoutSource = Arc<dyn Fn() -> WindowLayout + Send + Sync>;

/// Owns every file under the root directory. Knows nothing about live windows.
pub struct PersistenceStore {
    root: PathBuf,
    layout_writer: Debouncer<LayoutSource>,
    config_writer: Debouncer<AppConfig>,
}

impl PersistenceStore {
    pub fn new(root: PathBuf, runtime: Handle) -> Self {
        info!("[PersistenceStore::new] Root directory: {:?}", root);

        let layout_path = root.join(CONFIGURATIONS_DIRECTORY_NAME).join(WINDOWS_FILENAME);
        let layout_writer = Debouncer::new("windows", PERSIST_DEBOUNCE, runtime.clone(), move |source: LayoutSource| {
            let path = layout_path.clone();
            let layout = source();
            async move {
                if let Err(e) = write_json(&path, &layout).await {
                    error!("[PersistenceStore] Failed to save window layout: {}", e);
                }
            }
        });

        let config_path = root.join(CONFIGURATIONS_DIRECTORY_NAME).join(CONFIG_FILENAME);
        let config_writer = Debouncer::new("config", PERSIST_DEBOUNCE, runtime, move |config: AppConfig| {
            let path = config_path.clone();
            async move {
                if let Err(e) = write_json(&path, &config).await {
                    error!("[PersistenceStore] Failed to save config: {}", e);
                }
            }
        });

        Self {
            root,
            layout_writer,
            config_writer,
        }
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.root.join(NOTES_DIRECTORY_NAME)
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join(CONFIGURATIONS_DIRECTORY_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir().join(CONFIG_FILENAME)
    }

    pub fn window_layout_path(&self) -> PathBuf {
        self.config_dir().join(WINDOWS_FILENAME)
    }

    pub fn note_path(&self, title: &str) -> PathBuf {
        self.notes_dir().join(format!("{}.{}", slugify(title), NOTE_EXTENSION))
    }

    // ============================================
    // NOTES
    // ============================================

    /// Every note file with its modification time. An unreadable directory yields an empty list.
    pub async fn list_notes(&self) -> Vec<NoteDetails> {
        let notes_dir = self.notes_dir();
        ensure_dir(&notes_dir).await;

        let mut entries = match fs::read_dir(&notes_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("[list_notes] Cannot read {:?}: {}", notes_dir, e);
                return Vec::new();
            }
        };

        let mut notes = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("[list_notes] Stopped listing early: {}", e);
                    break;
                }
            };

            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != NOTE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("[list_notes] Cannot stat {:?}: {}", path, e);
                    continue;
                }
            };
            let millis = chrono::DateTime::<chrono::Utc>::from(modified).timestamp_millis();
            notes.push(NoteDetails::new(title_from_file_stem(stem), millis));
        }

        notes.sort_by(|a, b| a.title.cmp(&b.title));
        debug!("[list_notes] Found {} notes", notes.len());
        notes
    }

    pub async fn read_note_content(&self, title: &str) -> Result<String> {
        if !is_valid_title(title) {
            return Err(HoverpadError::InvalidTitle(title.to_string()));
        }
        ensure_dir(&self.notes_dir()).await;

        let path = self.note_path(title);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(HoverpadError::NoteNotFound(title.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Read several notes concurrently. A failed read leaves None in that slot.
    pub async fn read_note_content_batch(&self, titles: &[String]) -> Vec<Option<NoteContent>> {
        let reads = titles.iter().map(|title| async move {
            match self.read_note_content(title).await {
                Ok(content) => Some((title.clone(), content)),
                Err(e) => {
                    warn!("[read_note_content_batch] Skipping {:?}: {}", title, e);
                    None
                }
            }
        });
        futures::future::join_all(reads).await
    }

    /// Write `content` under `title`. On rename the old file is removed only after
    /// the new one is on disk, and never when both titles share a file name.
    pub async fn write_note(&self, title: &str, previous_title: &str, content: &str) -> Result<()> {
        if !is_valid_title(title) {
            return Err(HoverpadError::InvalidTitle(title.to_string()));
        }
        info!("[write_note] {:?} (previous: {:?})", title, previous_title);

        let notes_dir = self.notes_dir();
        fs::create_dir_all(&notes_dir).await?;
        fs::write(self.note_path(title), content).await?;

        let renamed = !previous_title.is_empty() && slugify(previous_title) != slugify(title);
        if renamed && is_valid_title(previous_title) {
            remove_if_exists(&self.note_path(previous_title)).await?;
        }
        Ok(())
    }

    /// Remove a note's file. Already-missing files are fine.
    pub async fn delete_note(&self, title: &str) -> Result<()> {
        if !is_valid_title(title) {
            return Err(HoverpadError::InvalidTitle(title.to_string()));
        }
        info!("[delete_note] {:?}", title);
        ensure_dir(&self.notes_dir()).await;
        remove_if_exists(&self.note_path(title)).await
    }

    // ============================================
    // CONFIG
    // ============================================

    /// Persisted configuration, or defaults when missing or corrupt
    pub async fn load_config(&self) -> AppConfig {
        ensure_dir(&self.config_dir()).await;
        match read_json::<AppConfig>(&self.config_path()).await {
            Ok(config) => {
                info!("[load_config] Loaded {:?}", config);
                config
            }
            Err(e) => {
                warn!("[load_config] Using defaults: {}", e);
                AppConfig::default()
            }
        }
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        write_json(&self.config_path(), config).await
    }

    pub fn schedule_config_save(&self, config: AppConfig) {
        self.config_writer.schedule(config);
    }

    // ============================================
    // WINDOW LAYOUT
    // ============================================

    /// Persisted layout, or a control-panel-only default when missing or corrupt
    pub async fn load_window_layout(&self) -> WindowLayout {
        ensure_dir(&self.config_dir()).await;
        match read_json::<WindowLayout>(&self.window_layout_path()).await {
            Ok(layout) => {
                info!("[load_window_layout] Loaded {} entries", layout.len());
                layout
            }
            Err(e) => {
                warn!("[load_window_layout] Using default layout: {}", e);
                default_window_layout()
            }
        }
    }

    pub async fn save_window_layout(&self, layout: &WindowLayout) -> Result<()> {
        write_json(&self.window_layout_path(), layout).await
    }

    /// Mark the layout dirty; `source` is read when the write actually happens
    pub fn schedule_window_layout_save(&self, source: LayoutSource) {
        self.layout_writer.schedule(source);
    }

    /// Write every pending snapshot now
    pub async fn flush(&self) {
        tokio::join!(self.layout_writer.flush_now(), self.config_writer.flush_now());
    }
}

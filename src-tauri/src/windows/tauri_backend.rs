// Tauri window backend

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tauri::{
    AppHandle, Emitter, LogicalSize, Size, Url, WebviewUrl, WebviewWindow, WebviewWindowBuilder, WindowEvent,
};
use tracing::{debug, error, info, warn};
use urlencoding::encode;

use super::{NativeEvent, NativeEventListener, NativeWindow, WindowBackend, WindowSpec};
use crate::constants::SET_OPACITY;
use crate::error::{HoverpadError, Result};
use crate::models::WindowBounds;

fn window_error(e: tauri::Error) -> HoverpadError {
    HoverpadError::Window(e.to_string())
}

/// Outer bounds in logical pixels, matching what is persisted
fn logical_bounds(window: &WebviewWindow) -> Option<WindowBounds> {
    let scale = window.scale_factor().ok()?;
    let position = window.outer_position().ok()?.to_logical::<i32>(scale);
    let size = window.outer_size().ok()?.to_logical::<u32>(scale);
    Some(WindowBounds::new(position.x, position.y, size.width, size.height))
}

/// External links open in the system browser instead of inside a note
fn allow_navigation(url: &Url) -> bool {
    let external = matches!(url.scheme(), "http" | "https")
        && !matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("tauri.localhost"));
    if !external {
        return true;
    }
    info!("[TauriBackend] Opening external link {}", url);
    if let Err(e) = tauri_plugin_opener::open_url(url.as_str(), None::<&str>) {
        error!("[TauriBackend] Failed to open {}: {}", url, e);
    }
    false
}

fn page_url(spec: &WindowSpec) -> String {
    let query: Vec<String> = spec
        .query
        .iter()
        .map(|(key, value)| format!("{}={}", key, encode(value)))
        .collect();
    format!("index.html?{}", query.join("&"))
}

#[derive(Clone)]
pub struct TauriWindow {
    window: WebviewWindow,
    destroyed: Arc<AtomicBool>,
}

impl NativeWindow for TauriWindow {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    fn bounds(&self) -> Option<WindowBounds> {
        if self.is_destroyed() {
            return None;
        }
        logical_bounds(&self.window)
    }

    /// Web views have no native alpha; the page applies it
    fn set_opacity(&self, opacity: f64) -> Result<()> {
        self.send(SET_OPACITY, opacity)
    }

    fn set_ignore_mouse_events(&self, ignore: bool) -> Result<()> {
        self.window.set_ignore_cursor_events(ignore).map_err(window_error)
    }

    fn set_resizable(&self, resizable: bool) -> Result<()> {
        self.window.set_resizable(resizable).map_err(window_error)
    }

    fn set_size(&self, width: u32, height: u32) -> Result<()> {
        self.window
            .set_size(Size::Logical(LogicalSize::new(f64::from(width), f64::from(height))))
            .map_err(window_error)
    }

    fn set_title(&self, title: &str) -> Result<()> {
        self.window.set_title(title).map_err(window_error)
    }

    fn focus(&self) -> Result<()> {
        self.window.set_focus().map_err(window_error)
    }

    fn set_always_on_top(&self, always_on_top: bool) -> Result<()> {
        self.window.set_always_on_top(always_on_top).map_err(window_error)
    }

    fn close(&self) -> Result<()> {
        self.window.close().map_err(window_error)
    }

    fn send<T: Serialize + Clone>(&self, channel: &str, payload: T) -> Result<()> {
        self.window
            .emit_to(self.window.label(), channel, payload)
            .map_err(window_error)
    }
}

pub struct TauriBackend {
    app: AppHandle,
}

impl TauriBackend {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl WindowBackend for TauriBackend {
    type Window = TauriWindow;

    fn create_window(&self, spec: WindowSpec, listener: NativeEventListener) -> Result<TauriWindow> {
        let url = page_url(&spec);
        debug!("[TauriBackend::create_window] {} -> {}", spec.label, url);

        let mut builder = WebviewWindowBuilder::new(&self.app, &spec.label, WebviewUrl::App(url.into()))
            .title(&spec.title)
            .inner_size(f64::from(spec.width), f64::from(spec.height))
            .resizable(spec.resizable)
            .decorations(false)
            .transparent(true)
            .always_on_top(true)
            .skip_taskbar(true)
            .shadow(false)
            .visible(true)
            .on_navigation(allow_navigation);
        if let Some((x, y)) = spec.position {
            builder = builder.position(f64::from(x), f64::from(y));
        }

        let window = builder.build().map_err(|e| {
            error!("[TauriBackend::create_window] Failed to build {}: {}", spec.label, e);
            window_error(e)
        })?;

        let destroyed = Arc::new(AtomicBool::new(false));
        let flag = destroyed.clone();
        let observed = window.clone();
        window.on_window_event(move |event| match event {
            WindowEvent::Moved(_) | WindowEvent::Resized(_) => match logical_bounds(&observed) {
                Some(bounds) => listener(NativeEvent::Geometry(bounds)),
                None => warn!("[TauriBackend] Could not read bounds of {}", observed.label()),
            },
            WindowEvent::Destroyed => {
                flag.store(true, Ordering::Release);
                listener(NativeEvent::Destroyed);
            }
            _ => {}
        });

        Ok(TauriWindow { window, destroyed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{WindowId, WindowKind};

    #[test]
    fn test_page_url_encodes_query() {
        let spec = WindowSpec {
            id: WindowId(3),
            kind: WindowKind::Note,
            label: "note-3".to_string(),
            title: "a b".to_string(),
            position: None,
            width: 1,
            height: 1,
            resizable: true,
            query: vec![("windowType", "NOTE".to_string()), ("title", "a b&c".to_string())],
        };
        assert_eq!(page_url(&spec), "index.html?windowType=NOTE&title=a%20b%26c");
    }

    #[test]
    fn test_local_navigation_is_allowed() {
        assert!(allow_navigation(&Url::parse("tauri://localhost/index.html").unwrap()));
        assert!(allow_navigation(&Url::parse("http://localhost:1420/").unwrap()));
    }
}

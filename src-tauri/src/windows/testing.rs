// In-memory window backend for tests
// Records every call so tests can assert on what the window layer pushed.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::{NativeEvent, NativeEventListener, NativeWindow, WindowBackend, WindowSpec};
use crate::error::{HoverpadError, Result};
use crate::models::{WindowBounds, WindowId};

#[derive(Debug, Clone)]
pub struct FakeWindowState {
    pub bounds: WindowBounds,
    pub opacity: f64,
    pub ignore_mouse_events: bool,
    pub resizable: bool,
    pub title: String,
    pub focused: bool,
    pub always_on_top: bool,
    pub destroyed: bool,
    pub sent: Vec<(String, serde_json::Value)>,
    pub calls: Vec<String>,
}

#[derive(Clone)]
pub struct FakeWindow {
    spec: Arc<WindowSpec>,
    state: Arc<Mutex<FakeWindowState>>,
    listener: Arc<NativeEventListener>,
}

impl FakeWindow {
    pub fn state(&self) -> FakeWindowState {
        self.state.lock().clone()
    }

    pub fn query(&self, key: &str) -> Option<String> {
        self.spec
            .query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    }

    /// Messages sent on one channel, oldest first
    pub fn sent_on(&self, channel: &str) -> Vec<serde_json::Value> {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Simulate the user moving, resizing or closing the window
    pub fn emit(&self, event: NativeEvent) {
        match event {
            NativeEvent::Geometry(bounds) => self.state.lock().bounds = bounds,
            NativeEvent::Destroyed => self.state.lock().destroyed = true,
        }
        (self.listener)(event);
    }

    /// Destroyed without the toolkit telling anyone
    pub fn mark_destroyed_silently(&self) {
        self.state.lock().destroyed = true;
    }

    fn record(&self, call: String) -> Result<()> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(HoverpadError::Window(format!("{} on destroyed window", call)));
        }
        state.calls.push(call);
        Ok(())
    }
}

impl NativeWindow for FakeWindow {
    fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    fn bounds(&self) -> Option<WindowBounds> {
        let state = self.state.lock();
        (!state.destroyed).then_some(state.bounds)
    }

    fn set_opacity(&self, opacity: f64) -> Result<()> {
        self.record(format!("set_opacity({opacity})"))?;
        self.state.lock().opacity = opacity;
        Ok(())
    }

    fn set_ignore_mouse_events(&self, ignore: bool) -> Result<()> {
        self.record(format!("set_ignore_mouse_events({ignore})"))?;
        self.state.lock().ignore_mouse_events = ignore;
        Ok(())
    }

    fn set_resizable(&self, resizable: bool) -> Result<()> {
        self.record(format!("set_resizable({resizable})"))?;
        self.state.lock().resizable = resizable;
        Ok(())
    }

    fn set_size(&self, width: u32, height: u32) -> Result<()> {
        self.record(format!("set_size({width}x{height})"))?;
        let mut state = self.state.lock();
        if !state.resizable {
            return Err(HoverpadError::Window("set_size on fixed-size window".to_string()));
        }
        state.bounds.width = width;
        state.bounds.height = height;
        Ok(())
    }

    fn set_title(&self, title: &str) -> Result<()> {
        self.record(format!("set_title({title})"))?;
        self.state.lock().title = title.to_string();
        Ok(())
    }

    fn focus(&self) -> Result<()> {
        self.record("focus".to_string())?;
        self.state.lock().focused = true;
        Ok(())
    }

    fn set_always_on_top(&self, always_on_top: bool) -> Result<()> {
        self.record(format!("set_always_on_top({always_on_top})"))?;
        self.state.lock().always_on_top = always_on_top;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.record("close".to_string())?;
        self.emit(NativeEvent::Destroyed);
        Ok(())
    }

    fn send<T: Serialize + Clone>(&self, channel: &str, payload: T) -> Result<()> {
        let value = serde_json::to_value(payload)?;
        self.record(format!("send({channel})"))?;
        self.state.lock().sent.push((channel.to_string(), value));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBackend {
    windows: Mutex<HashMap<WindowId, FakeWindow>>,
}

impl FakeBackend {
    pub fn window(&self, id: WindowId) -> Option<FakeWindow> {
        self.windows.lock().get(&id).cloned()
    }

    pub fn spec(&self, id: WindowId) -> Option<WindowSpec> {
        self.windows.lock().get(&id).map(|w| (*w.spec).clone())
    }

    pub fn window_by_label(&self, label: &str) -> Option<FakeWindow> {
        self.windows.lock().values().find(|w| w.spec.label == label).cloned()
    }

    pub fn live_windows(&self) -> usize {
        self.windows.lock().values().filter(|w| !w.is_destroyed()).count()
    }
}

impl WindowBackend for FakeBackend {
    type Window = FakeWindow;

    fn create_window(&self, spec: WindowSpec, listener: NativeEventListener) -> Result<FakeWindow> {
        let (x, y) = spec.position.unwrap_or((0, 0));
        let state = FakeWindowState {
            bounds: WindowBounds::new(x, y, spec.width, spec.height),
            opacity: 1.0,
            ignore_mouse_events: false,
            resizable: spec.resizable,
            title: spec.title.clone(),
            focused: false,
            always_on_top: true,
            destroyed: false,
            sent: Vec::new(),
            calls: Vec::new(),
        };
        let window = FakeWindow {
            spec: Arc::new(spec),
            state: Arc::new(Mutex::new(state)),
            listener: Arc::new(listener),
        };
        self.windows.lock().insert(window.spec.id, window.clone());
        Ok(window)
    }
}

use crate::models::WindowCategory;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::ShellResult;
use super::settings_store::SettingsStore;

/// The slice of a runtime window the binder needs.
pub trait ManagedWindow {
    fn label(&self) -> String;
    fn maximize(&self) -> ShellResult<()>;
}

/// Windows parks minimized windows at this coordinate.
pub const MINIMIZED_PARK_POSITION: i32 = -32000;

/// Geometry change reported for a bound window, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSignal {
    Maximized,
    Unmaximized,
    Resized { width: i32, height: i32 },
    Moved { x: i32, y: i32 },
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    category: WindowCategory,
    /// Last maximize state seen, used to turn resizes into maximize/unmaximize.
    maximized: bool,
}

/// Mirrors window geometry into the category buckets of a [`SettingsStore`].
pub struct WindowBinder {
    store: Arc<SettingsStore>,
    bindings: Mutex<HashMap<String, Binding>>,
}

impl WindowBinder {
    pub fn new(store: Arc<SettingsStore>) -> Self {
        Self {
            store,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    /// Attaches `window` to `category`. Rebinding a label replaces the previous binding.
    pub fn bind<W: ManagedWindow>(&self, window: &W, category: WindowCategory) -> ShellResult<()> {
        let maximized = self.store.category(category).maximized;
        self.bindings
            .lock()
            .insert(window.label(), Binding { category, maximized });

        if maximized {
            window.maximize()?;
        }
        Ok(())
    }

    pub fn unbind(&self, label: &str) -> Option<WindowCategory> {
        self.bindings.lock().remove(label).map(|b| b.category)
    }

    pub fn category_of(&self, label: &str) -> Option<WindowCategory> {
        self.bindings.lock().get(label).map(|b| b.category)
    }

    /// Writes one signal into the bound category and flushes. Returns `Ok(false)` for
    /// labels that were never bound.
    pub fn apply(&self, label: &str, signal: WindowSignal) -> ShellResult<bool> {
        let category = {
            let mut bindings = self.bindings.lock();
            let Some(binding) = bindings.get_mut(label) else {
                return Ok(false);
            };
            match signal {
                WindowSignal::Maximized => binding.maximized = true,
                WindowSignal::Unmaximized => binding.maximized = false,
                _ => {}
            }
            binding.category
        };

        self.store.update(category, |entry| match signal {
            WindowSignal::Maximized => entry.maximized = true,
            WindowSignal::Unmaximized => entry.maximized = false,
            WindowSignal::Resized { width, height } => {
                entry.width = width;
                entry.height = height;
            }
            WindowSignal::Moved { x, y } => {
                entry.x = x;
                entry.y = y;
            }
        })?;
        Ok(true)
    }

    /// Turns a runtime resize into signals: a maximize transition first when the
    /// window's maximized state flipped, then the size itself. Minimized windows and
    /// empty sizes produce nothing.
    pub fn signals_for_resize(
        &self,
        label: &str,
        width: i32,
        height: i32,
        is_maximized: bool,
        is_minimized: bool,
    ) -> Vec<WindowSignal> {
        if is_minimized || width <= 0 || height <= 0 {
            return Vec::new();
        }
        let Some(was_maximized) = self.bindings.lock().get(label).map(|b| b.maximized) else {
            return Vec::new();
        };

        let mut signals = Vec::with_capacity(2);
        match (was_maximized, is_maximized) {
            (false, true) => signals.push(WindowSignal::Maximized),
            (true, false) => signals.push(WindowSignal::Unmaximized),
            _ => {}
        }
        signals.push(WindowSignal::Resized { width, height });
        signals
    }

    /// Turns a runtime move into a signal, skipping minimized windows.
    pub fn signals_for_move(
        &self,
        label: &str,
        x: i32,
        y: i32,
        is_minimized: bool,
    ) -> Vec<WindowSignal> {
        let parked = x <= MINIMIZED_PARK_POSITION && y <= MINIMIZED_PARK_POSITION;
        if is_minimized || parked || !self.bindings.lock().contains_key(label) {
            return Vec::new();
        }
        vec![WindowSignal::Moved { x, y }]
    }

    /// Applies every signal in order, stopping at the first failed flush.
    pub fn apply_all(&self, label: &str, signals: &[WindowSignal]) -> ShellResult<()> {
        for signal in signals {
            self.apply(label, *signal)?;
        }
        Ok(())
    }
}

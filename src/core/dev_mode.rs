use std::sync::atomic::{AtomicBool, Ordering};
use tauri::{AppHandle, Manager, Runtime};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

use super::app_log;
use super::shell::ShellState;

pub const TOGGLE_SHORTCUT: &str = "CommandOrControl+Shift+K";

/// Developer-mode flag read whenever a window is created.
#[derive(Debug, Default)]
pub struct DevMode(AtomicBool);

impl DevMode {
    pub fn new(enabled: bool) -> Self {
        Self(AtomicBool::new(enabled))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::Relaxed)
    }
}

pub fn register_toggle_shortcut<R: Runtime>(app: &AppHandle<R>) -> Result<(), String> {
    app.global_shortcut()
        .on_shortcut(TOGGLE_SHORTCUT, |app, _shortcut, event| {
            if event.state() != ShortcutState::Pressed {
                return;
            }
            let enabled = app.state::<ShellState>().dev_mode().toggle();
            let _ = app_log::info(
                app,
                "devtools",
                if enabled { "dev_mode_on" } else { "dev_mode_off" },
            );
        })
        .map_err(|e| format!("Failed to register {}: {}", TOGGLE_SHORTCUT, e))
}

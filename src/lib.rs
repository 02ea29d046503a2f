pub mod cli;
pub mod core;
pub mod models;

use crate::cli::LaunchOptions;
use crate::core::settings_store::SETTINGS_FILE_NAME;
use crate::core::shell::{self, ShellState};
use crate::core::{app_log, dev_mode, JsonFileBackend, NavigationClassifier, SettingsStore};
use anyhow::Context;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::{AppHandle, Manager, Runtime};

fn parse_launch_options() -> (LaunchOptions, Option<String>) {
    match LaunchOptions::try_parse() {
        Ok(options) => (options, None),
        // --help / --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => (LaunchOptions::default(), Some(e.to_string())),
    }
}

fn load_settings<R: Runtime>(app_handle: &AppHandle<R>, path: PathBuf) -> SettingsStore {
    match SettingsStore::load(JsonFileBackend::new(&path)) {
        Ok(store) => store,
        Err(e) => {
            let _ = app_log::warn(
                app_handle,
                "settings",
                "load_failed_using_defaults",
                json!({ "path": path.display().to_string(), "error": e.to_string() }),
            );
            SettingsStore::with_defaults(JsonFileBackend::new(path))
        }
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let (options, arg_error) = parse_launch_options();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .setup(move |app| {
            let app_handle = app.handle().clone();
            app_log::install_panic_hook(app_handle.clone());
            let _ = app_log::info(&app_handle, "app", "startup");
            if let Some(error) = arg_error {
                let _ = app_log::warn(
                    &app_handle,
                    "app",
                    "invalid_arguments",
                    json!({ "error": error }),
                );
            }

            let settings_path = app_handle
                .path()
                .app_config_dir()
                .context("Failed to resolve config dir")?
                .join(SETTINGS_FILE_NAME);
            let store = load_settings(&app_handle, settings_path);

            if options.dev {
                let _ = app_log::append(
                    &app_handle,
                    app_log::AppLogRecord::new(
                        "debug",
                        "settings",
                        "loaded",
                        serde_json::to_value(store.record()).ok(),
                    ),
                );
            }

            app.manage(ShellState::new(
                Arc::new(store),
                NavigationClassifier::default(),
                options.dev,
            ));

            if let Err(e) = dev_mode::register_toggle_shortcut(&app_handle) {
                let _ = app_log::warn(
                    &app_handle,
                    "devtools",
                    "shortcut_unavailable",
                    json!({ "error": e }),
                );
            }

            shell::open_main_window(&app_handle, &options)
                .context("Failed to open the main window")?;

            Ok(())
        })
        .on_window_event(|window, event| {
            shell::handle_window_event(window, event);
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

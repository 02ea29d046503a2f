use crate::cli::{login_script, LaunchOptions, SessionHandoff};
use crate::models::{GeometryEntry, WindowCategory};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tauri::webview::{NewWindowResponse, PageLoadEvent};
use tauri::{
    AppHandle, LogicalPosition, LogicalSize, Manager, Runtime, WebviewUrl, WebviewWindow,
    WebviewWindowBuilder, Window, WindowEvent,
};
use tauri_plugin_opener::OpenerExt;
use url::Url;

use super::app_log;
use super::dev_mode::DevMode;
use super::error::{ShellError, ShellResult};
use super::navigation::{
    external_scheme, NavigationClassifier, NavigationRequest, Outcome,
};
use super::settings_store::SettingsStore;
use super::window_binder::{ManagedWindow, WindowBinder, MINIMIZED_PARK_POSITION};

pub const MAIN_WINDOW_LABEL: &str = "main";
const WINDOW_TITLE: &str = "DarkOrbit";

/// Services shared by every window, managed as Tauri state.
pub struct ShellState {
    classifier: NavigationClassifier,
    binder: WindowBinder,
    dev_mode: DevMode,
    next_window_id: AtomicU64,
}

impl ShellState {
    pub fn new(store: Arc<SettingsStore>, classifier: NavigationClassifier, dev: bool) -> Self {
        Self {
            classifier,
            binder: WindowBinder::new(store),
            dev_mode: DevMode::new(dev),
            next_window_id: AtomicU64::new(1),
        }
    }

    pub fn binder(&self) -> &WindowBinder {
        &self.binder
    }

    pub fn dev_mode(&self) -> &DevMode {
        &self.dev_mode
    }

    fn next_label(&self, category: WindowCategory) -> String {
        let id = self.next_window_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", category, id)
    }
}

impl<R: Runtime> ManagedWindow for WebviewWindow<R> {
    fn label(&self) -> String {
        WebviewWindow::label(self).to_string()
    }

    fn maximize(&self) -> ShellResult<()> {
        WebviewWindow::maximize(self)
            .map_err(|e| ShellError::window(format!("Failed to maximize window: {}", e)))
    }
}

fn window_builder<'a, R: Runtime>(
    app: &'a AppHandle<R>,
    label: &str,
    url: Url,
    geometry: GeometryEntry,
    devtools: bool,
) -> WebviewWindowBuilder<'a, R, AppHandle<R>> {
    let handle = app.clone();
    let origin_label = label.to_string();

    let mut builder = WebviewWindowBuilder::new(app, label, WebviewUrl::External(url))
        .title(WINDOW_TITLE)
        .inner_size(geometry.width as f64, geometry.height as f64)
        .position(geometry.x as f64, geometry.y as f64)
        .devtools(devtools)
        .on_new_window(move |url, _features| {
            let request = NavigationRequest::new(url.as_str(), origin_label.clone());
            let app = handle.clone();
            // Building windows from inside the webview callback can deadlock.
            tauri::async_runtime::spawn(async move {
                route_request(&app, request);
            });
            NewWindowResponse::Deny
        });

    if let Some(user_agent) = app.state::<ShellState>().binder().store().user_agent() {
        builder = builder.user_agent(&user_agent);
    }
    builder
}

/// Creates the `client` window the whole session hangs off.
pub fn open_main_window<R: Runtime>(
    app: &AppHandle<R>,
    options: &LaunchOptions,
) -> ShellResult<WebviewWindow<R>> {
    let state = app.state::<ShellState>();
    let start = options.start_url();
    let url = Url::parse(&start).map_err(|source| ShellError::InvalidUrl {
        url: start.clone(),
        source,
    })?;
    let devtools = state.dev_mode().is_enabled();
    let geometry = state.binder().store().category(WindowCategory::Client);

    let mut builder = window_builder(app, MAIN_WINDOW_LABEL, url, geometry, devtools);
    let session = options.session();
    if let Some(session) = &session {
        builder = builder.initialization_script(&session.cookie_script());
    }
    let handoff = session.map(SessionHandoff::new);
    let login = options.credentials().map(|c| login_script(&c));

    if handoff.is_some() || login.is_some() {
        builder = builder.on_page_load(move |window, payload| {
            if !matches!(payload.event(), PageLoadEvent::Finished) {
                return;
            }
            if let Some(next) = handoff.as_ref().and_then(|h| h.next_after(payload.url())) {
                if let Err(e) = window.navigate(next.clone()) {
                    let _ = app_log::error(
                        window.app_handle(),
                        "session",
                        "handoff_failed",
                        json!({ "url": next.as_str(), "error": e.to_string() }),
                    );
                }
                return;
            }
            if let Some(script) = &login {
                if let Err(e) = window.eval(script) {
                    let _ = app_log::error(
                        window.app_handle(),
                        "session",
                        "autologin_failed",
                        json!({ "error": e.to_string() }),
                    );
                }
            }
        });
    }

    let window = builder
        .build()
        .map_err(|e| ShellError::window(format!("Failed to create main window: {}", e)))?;

    if devtools {
        window.open_devtools();
    }
    state.binder().bind(&window, WindowCategory::Client)?;
    Ok(window)
}

/// Opens `url` in a new window sized from the category's bucket and binds it.
pub fn open_category_window<R: Runtime>(
    app: &AppHandle<R>,
    category: WindowCategory,
    url: Url,
) -> ShellResult<WebviewWindow<R>> {
    let state = app.state::<ShellState>();
    let label = state.next_label(category);
    let devtools = state.dev_mode().is_enabled();
    let geometry = state.binder().store().category(category);

    let window = window_builder(app, &label, url, geometry, devtools)
        .build()
        .map_err(|e| ShellError::window(format!("Failed to create {} window: {}", category, e)))?;

    if devtools {
        window.open_devtools();
    }
    state.binder().bind(&window, category)?;
    Ok(window)
}

/// Classifies a window-open request and carries out the outcome.
pub fn route_request<R: Runtime>(app: &AppHandle<R>, request: NavigationRequest) {
    let outcome = app.state::<ShellState>().classifier.classify(&request);
    let _ = app_log::append(
        app,
        app_log::AppLogRecord::new(
            "info",
            "navigation",
            outcome.tag(),
            Some(json!({ "url": request.target_url, "origin": request.origin_label })),
        ),
    );

    if let Err(e) = dispatch(app, &request, outcome) {
        let _ = app_log::error(
            app,
            "navigation",
            "dispatch_failed",
            json!({ "url": request.target_url, "error": e.to_string() }),
        );
    }
}

fn dispatch<R: Runtime>(
    app: &AppHandle<R>,
    request: &NavigationRequest,
    outcome: Outcome,
) -> ShellResult<()> {
    match outcome {
        Outcome::Suppress => {
            // The request itself is dropped; a logout ends the window that asked for it.
            if let Some(origin) = app.get_webview_window(&request.origin_label) {
                origin
                    .close()
                    .map_err(|e| ShellError::window(format!("Failed to close window: {}", e)))?;
            }
        }
        Outcome::RedirectInPlace(url) => {
            let origin = app
                .get_webview_window(&request.origin_label)
                .ok_or_else(|| {
                    ShellError::window(format!("Window {} not found", request.origin_label))
                })?;
            origin
                .navigate(url)
                .map_err(|e| ShellError::window(format!("Failed to navigate: {}", e)))?;
        }
        Outcome::OpenWindow { category, url } => {
            open_category_window(app, category, url)?;
        }
        Outcome::DelegateToOs(raw) => {
            if let Err(scheme) = external_scheme(&raw) {
                let _ = app_log::warn(
                    app,
                    "navigation",
                    "external_blocked",
                    json!({ "url": raw, "scheme": scheme }),
                );
                return Ok(());
            }
            app.opener()
                .open_url(raw, None::<&str>)
                .map_err(|e| ShellError::window(format!("Failed to open external url: {}", e)))?;
        }
    }
    Ok(())
}

/// Feeds geometry events of bound windows into the binder.
pub fn handle_window_event<R: Runtime>(window: &Window<R>, event: &WindowEvent) {
    let app = window.app_handle();
    let Some(state) = app.try_state::<ShellState>() else {
        return;
    };
    let binder = state.binder();
    let label = window.label();
    let minimized = || window.is_minimized().unwrap_or(false);

    let result = match event {
        WindowEvent::Resized(size) => {
            let scale = window.scale_factor().unwrap_or(1.0);
            let logical: LogicalSize<f64> = size.to_logical(scale);
            let maximized = window.is_maximized().unwrap_or(false);
            let signals = binder.signals_for_resize(
                label,
                logical.width.round() as i32,
                logical.height.round() as i32,
                maximized,
                minimized(),
            );
            binder.apply_all(label, &signals)
        }
        WindowEvent::Moved(position) => {
            let scale = window.scale_factor().unwrap_or(1.0);
            let logical: LogicalPosition<f64> = position.to_logical(scale);
            // The park position is reported in physical pixels.
            let signals = if position.x <= MINIMIZED_PARK_POSITION
                && position.y <= MINIMIZED_PARK_POSITION
            {
                Vec::new()
            } else {
                binder.signals_for_move(
                    label,
                    logical.x.round() as i32,
                    logical.y.round() as i32,
                    minimized(),
                )
            };
            binder.apply_all(label, &signals)
        }
        WindowEvent::Destroyed => {
            binder.unbind(label);
            Ok(())
        }
        _ => Ok(()),
    };

    if let Err(e) = result {
        let _ = app_log::error(
            app,
            "settings",
            "persist_failed",
            json!({ "window": label, "error": e.to_string() }),
        );
    }
}

pub mod app_log;
pub mod dev_mode;
pub mod error;
pub mod navigation;
pub mod settings_store;
pub mod shell;
pub mod window_binder;

pub use error::{ShellError, ShellResult};
pub use navigation::{NavigationClassifier, NavigationRequest, Outcome};
pub use settings_store::{JsonFileBackend, SettingsStore};
pub use window_binder::{ManagedWindow, WindowBinder, WindowSignal};

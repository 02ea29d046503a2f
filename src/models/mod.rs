pub mod settings;
pub mod window_geometry;

pub use settings::SettingsRecord;
pub use window_geometry::{GeometryEntry, WindowCategory};

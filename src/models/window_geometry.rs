use serde::{Deserialize, Serialize};
use std::fmt;

/// Settings bucket a window reads its geometry from and writes it back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowCategory {
    Client,
    Game,
    Board,
    Config,
}

impl WindowCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            WindowCategory::Client => "client",
            WindowCategory::Game => "game",
            WindowCategory::Board => "board",
            WindowCategory::Config => "config",
        }
    }
}

impl fmt::Display for WindowCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryEntry {
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub y: i32,
    /// Stored as `max` to stay readable by older settings files.
    #[serde(rename = "max")]
    pub maximized: bool,
}

impl GeometryEntry {
    pub const fn new(width: i32, height: i32, x: i32, y: i32) -> Self {
        Self {
            width,
            height,
            x,
            y,
            maximized: false,
        }
    }
}

impl Default for GeometryEntry {
    fn default() -> Self {
        Self::new(1280, 800, 100, 100)
    }
}

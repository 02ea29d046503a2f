use super::window_geometry::{GeometryEntry, WindowCategory};
use serde::{Deserialize, Serialize};

/// Everything persisted in `settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsRecord {
    /// Set once the defaults have been written; a record without it is reset on load.
    #[serde(default)]
    pub check: bool,
    pub client: GeometryEntry,
    pub game: GeometryEntry,
    pub board: GeometryEntry,
    pub config: GeometryEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self {
            check: true,
            client: GeometryEntry::new(1280, 800, 100, 100),
            game: GeometryEntry::new(1280, 800, 120, 120),
            board: GeometryEntry::new(1100, 800, 140, 140),
            config: GeometryEntry::new(900, 700, 160, 160),
            user_agent: None,
        }
    }
}

impl SettingsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geometry(&self, category: WindowCategory) -> &GeometryEntry {
        match category {
            WindowCategory::Client => &self.client,
            WindowCategory::Game => &self.game,
            WindowCategory::Board => &self.board,
            WindowCategory::Config => &self.config,
        }
    }

    pub fn geometry_mut(&mut self, category: WindowCategory) -> &mut GeometryEntry {
        match category {
            WindowCategory::Client => &mut self.client,
            WindowCategory::Game => &mut self.game,
            WindowCategory::Board => &mut self.board,
            WindowCategory::Config => &mut self.config,
        }
    }
}

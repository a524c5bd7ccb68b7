//! User settings stored as a single JSON object.

use std::sync::Arc;

use crate::error::{BookshelfError, Result};
use crate::traits::KeyValueStorage;
use crate::types::Settings;

pub const SETTINGS_KEY: &str = "settings";

pub struct SettingsStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Stored settings; missing fields take their defaults.
    pub fn load(&self) -> Result<Settings> {
        match self.storage.get_item(SETTINGS_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| BookshelfError::json("Failed to parse stored settings", e)),
            None => Ok(Settings::default()),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let raw = serde_json::to_string(settings)
            .map_err(|e| BookshelfError::json("Failed to serialize settings", e))?;
        self.storage.set_item(SETTINGS_KEY, &raw)
    }
}

use common::models::Settings;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::{db::LocalDb, error::StorageError, repositories::LocalStorageRepository};

pub const SETTINGS_KEY: &str = "dashboard_settings";

/// Persists the user's [`Settings`] as one JSON record.
#[derive(Clone)]
pub struct SettingsStore {
    pool: SqlitePool,
}

impl SettingsStore {
    pub fn new(db: &LocalDb) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Stored fields over defaults. A missing or unreadable record gives the
    /// defaults.
    pub async fn load(&self) -> Result<Settings, StorageError> {
        let Some(raw) = LocalStorageRepository::get(&self.pool, SETTINGS_KEY).await? else {
            debug!("No stored settings, using defaults");
            return Ok(Settings::default());
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(stored) => Ok(Settings::merged_over_defaults(&stored)),
            Err(e) => {
                warn!("Stored settings are unreadable ({}), using defaults", e);
                Ok(Settings::default())
            }
        }
    }

    pub async fn save(&self, settings: &Settings) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&settings.to_record()?)?;
        LocalStorageRepository::put(&self.pool, SETTINGS_KEY, &raw).await?;
        Ok(())
    }
}

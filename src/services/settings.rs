use std::sync::Arc;
use tracing::info;

use super::{ServiceError, StoreContext};
use crate::db::SettingsStore;
use crate::domain::{Settings, UserId};

#[derive(Debug, Clone)]
pub struct SettingsService {
    settings: Arc<dyn SettingsStore>,
}

impl SettingsService {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Saved settings, or the defaults when the user never saved any.
    pub async fn find_by_user_id(&self, user_id: &UserId) -> Result<Settings, ServiceError> {
        let found = self
            .settings
            .find_settings_by_user_id(user_id)
            .await
            .context(|| format!("failed to find settings of user {}", user_id))?;
        Ok(found.unwrap_or_else(|| Settings::default_for(user_id.clone())))
    }

    pub async fn update(&self, settings: &Settings) -> Result<Settings, ServiceError> {
        let saved = self
            .settings
            .upsert_settings(settings)
            .await
            .context(|| format!("failed to save settings of user {}", settings.user_id))?;
        info!(user_id = %saved.user_id, currency = saved.currency.as_str(), "Settings saved");
        Ok(saved)
    }

    pub async fn delete_by_user_id(&self, user_id: &UserId) -> Result<(), ServiceError> {
        self.settings
            .delete_settings_by_user_id(user_id)
            .await
            .context(|| format!("failed to delete settings of user {}", user_id))?;
        Ok(())
    }
}

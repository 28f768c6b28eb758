use anyhow::Result;

use super::config::AppSettings;

pub trait SettingsRepository {
    fn load(&self) -> Result<AppSettings>;
    fn save(&self, settings: &AppSettings) -> Result<()>;
}

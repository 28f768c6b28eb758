use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::config::AppSettings;
use crate::domain::ports::SettingsRepository;

pub const APP_DIR: &str = "tarsend";

/// 配置目录 (~/.config/tarsend 等)
pub fn app_config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find the system config directory"))?;
    path.push(APP_DIR);
    Ok(path)
}

pub fn default_profiles_path() -> Result<PathBuf> {
    Ok(app_config_dir()?.join("profiles.json"))
}

pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new() -> Result<Self> {
        Ok(Self::at(app_config_dir()?.join("settings.toml")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsRepository for TomlSettingsStore {
    fn load(&self) -> Result<AppSettings> {
        if self.path.exists() {
            let content = fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read settings file {:?}", self.path))?;
            let settings: AppSettings = toml::from_str(&content)
                .with_context(|| format!("Settings file {:?} is malformed", self.path))?;
            Ok(settings)
        } else {
            let settings = AppSettings::default();
            self.save(&settings)
                .with_context(|| "Failed to create the default settings file")?;
            Ok(settings)
        }
    }

    fn save(&self, settings: &AppSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = toml::to_string_pretty(settings).with_context(|| "Failed to serialize settings")?;

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write settings file {:?}", self.path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_path_not_empty() {
        let store = TomlSettingsStore::new().unwrap();
        assert!(store.path().to_string_lossy().contains(APP_DIR));
        assert!(store.path().to_string_lossy().contains("settings.toml"));
        assert!(default_profiles_path().unwrap().ends_with("tarsend/profiles.json"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let store = TomlSettingsStore::at(dir.path().join("cfg/settings.toml"));
        let settings = store.load().unwrap();
        assert_eq!(settings, AppSettings::default());
        assert!(store.path().exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = TomlSettingsStore::at(dir.path().join("settings.toml"));
        let settings = AppSettings {
            last_profile: Some("prod".into()),
            connect_timeout_secs: 5,
            ..AppSettings::default()
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn test_malformed_settings_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "connect_timeout_secs = \"soon\"").unwrap();
        assert!(TomlSettingsStore::at(path).load().is_err());
    }
}

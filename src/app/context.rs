use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use log::{debug, warn};

use crate::app::services::profile_service::DEFAULT_CONNECT_TIMEOUT;
use crate::domain::config::AppSettings;
use crate::domain::ports::SettingsRepository;
use crate::infra::config_store::{default_profiles_path, TomlSettingsStore};
use crate::infra::profile_store::ProfileStore;

pub struct AppContext {
    pub settings: AppSettings,
    pub settings_repo: Box<dyn SettingsRepository>,
    pub profiles: ProfileStore,
}

impl AppContext {
    /// 加载配置并打开 profile 存储；`profiles_override` 优先于配置中的路径
    pub fn bootstrap(profiles_override: Option<PathBuf>) -> Result<Self> {
        let repo = TomlSettingsStore::new()?;
        let settings = repo.load()?;
        debug!("Settings loaded from {:?}", repo.path());

        let profiles_path = match profiles_override.or_else(|| settings.profiles_file.clone()) {
            Some(path) => path,
            None => default_profiles_path()?,
        };
        debug!("Using profiles file {:?}", profiles_path);

        Ok(Self {
            settings,
            settings_repo: Box::new(repo),
            profiles: ProfileStore::open(profiles_path),
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        match self.settings.connect_timeout_secs {
            0 => DEFAULT_CONNECT_TIMEOUT,
            secs => Duration::from_secs(secs),
        }
    }

    /// 记录上次使用的 profile，失败只记日志
    pub fn remember_profile(&mut self, name: &str) {
        if self.settings.last_profile.as_deref() == Some(name) {
            return;
        }
        self.settings.last_profile = Some(name.to_string());
        if let Err(e) = self.settings_repo.save(&self.settings) {
            warn!("Could not save settings: {:#}", e);
        }
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 应用全局配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// profile 文件路径，为空时使用配置目录下的 profiles.json
    pub profiles_file: Option<PathBuf>,
    /// 连接超时 (秒)
    pub connect_timeout_secs: u64,
    /// 上传后是否默认在远程解压
    pub extract_by_default: bool,
    /// 临时归档目录，为空时使用系统临时目录
    pub temp_dir: Option<PathBuf>,
    /// 上次使用的 profile
    pub last_profile: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            profiles_file: None,
            connect_timeout_secs: 10,
            extract_by_default: true,
            temp_dir: None,
            last_profile: None,
        }
    }
}

impl AppSettings {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let s = AppSettings::default();
        assert_eq!(s.connect_timeout_secs, 10);
        assert!(s.extract_by_default);
        assert!(s.profiles_file.is_none());
        assert!(s.last_profile.is_none());
    }

    #[test]
    fn test_toml_roundtrip() {
        let settings = AppSettings {
            profiles_file: Some(PathBuf::from("/tmp/p.json")),
            last_profile: Some("prod".into()),
            ..AppSettings::default()
        };
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: AppSettings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: AppSettings = toml::from_str("connect_timeout_secs = 3\n").unwrap();
        assert_eq!(parsed.connect_timeout_secs, 3);
        assert!(parsed.extract_by_default);
    }
}

use std::time::Duration;

use log::info;

use crate::domain::profile::Profile;
use crate::infra::profile_store::ProfileStore;
use crate::infra::ssh::SshClient;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 测试连接，所有错误都转换为 (false, 消息)
pub fn test_connection(profile: &Profile, timeout: Duration) -> (bool, String) {
    if let Err(e) = profile.validate() {
        return (false, format!("Connection failed: {}", e));
    }
    match SshClient::connect(profile, timeout) {
        Ok(client) => {
            client.disconnect();
            info!("Connection test to {} succeeded", profile.host);
            (true, "Connection successful".to_string())
        }
        Err(e) => (false, format!("Connection failed: {:#}", e)),
    }
}

/// 选择要使用的 profile: 显式指定 > 上次使用 > 第一个
pub fn resolve_profile_name(
    store: &ProfileStore,
    requested: Option<&str>,
    last_used: Option<&str>,
) -> Option<String> {
    if let Some(name) = requested {
        return store.get_profile(name).map(|_| name.to_string());
    }
    last_used
        .filter(|name| store.get_profile(name).is_some())
        .map(str::to_string)
        .or_else(|| store.profile_names().into_iter().next())
}

use anyhow::{anyhow, bail, Result};
use log::info;
use ssh2::Session;

use crate::domain::profile::{Auth, Profile};

/// 按 profile 的 auth_method 认证
pub fn authenticate(session: &Session, profile: &Profile) -> Result<()> {
    match &profile.auth {
        Auth::Password { password } => {
            if password.is_empty() {
                bail!("Password is empty");
            }
            info!("Trying password authentication for {}", profile.username);
            session
                .userauth_password(&profile.username, password)
                .map_err(|e| anyhow!("Password authentication failed: {}", e))?;
        }
        Auth::Key { key_file } => {
            if key_file.as_os_str().is_empty() {
                bail!("No key file configured");
            }
            info!("Trying key authentication with {:?}", key_file);
            session
                .userauth_pubkey_file(&profile.username, None, key_file, None)
                .map_err(|e| anyhow!("Key authentication failed: {}", e))?;
        }
    }

    if !session.authenticated() {
        bail!("Authentication was not accepted by the server");
    }
    Ok(())
}

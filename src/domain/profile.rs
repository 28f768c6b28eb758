use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 22;

const REDACTED: &str = "********";

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// 连接 profile (名称是存储里的 key，不在记录本身)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// 主机地址 (IP 或域名)
    pub host: String,
    /// SSH 端口 (默认 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// 用户名
    pub username: String,
    /// 认证方式，磁盘上平铺为 auth_method + password / key_file
    #[serde(flatten)]
    pub auth: Auth,
    /// 远程目标目录
    #[serde(default)]
    pub remote_path: String,
}

/// 认证信息，由 `auth_method` 决定哪个字段生效
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "auth_method", rename_all = "lowercase")]
pub enum Auth {
    Password {
        #[serde(default)]
        password: String,
    },
    Key {
        #[serde(default)]
        key_file: PathBuf,
    },
}

impl Auth {
    pub fn method(&self) -> AuthMethod {
        match self {
            Auth::Password { .. } => AuthMethod::Password,
            Auth::Key { .. } => AuthMethod::Key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Password,
    Key,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Password => write!(f, "password"),
            AuthMethod::Key => write!(f, "key"),
        }
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "password" => Ok(AuthMethod::Password),
            "key" => Ok(AuthMethod::Key),
            other => Err(format!("unknown auth method '{}' (expected 'password' or 'key')", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a host/IP address.")]
    MissingHost,
    #[error("Please enter a username.")]
    MissingUsername,
    #[error("Port must be between 1 and 65535.")]
    InvalidPort,
    #[error("Please enter a password.")]
    MissingPassword,
    #[error("Please select a private key file.")]
    MissingKeyFile,
    #[error("Selected key file does not exist: {0}")]
    KeyFileNotFound(PathBuf),
    #[error("Please select files or folders to transfer.")]
    NoPaths,
    #[error("Please enter a remote path.")]
    MissingRemotePath,
}

impl Profile {
    pub fn with_password(host: &str, port: u16, username: &str, password: &str, remote_path: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            username: username.to_string(),
            auth: Auth::Password {
                password: password.to_string(),
            },
            remote_path: remote_path.to_string(),
        }
    }

    pub fn with_key_file(host: &str, port: u16, username: &str, key_file: impl Into<PathBuf>, remote_path: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            username: username.to_string(),
            auth: Auth::Key {
                key_file: key_file.into(),
            },
            remote_path: remote_path.to_string(),
        }
    }

    /// 发起连接前的检查
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingHost);
        }
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingUsername);
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        match &self.auth {
            Auth::Password { password } if password.is_empty() => Err(ValidationError::MissingPassword),
            Auth::Password { .. } => Ok(()),
            Auth::Key { key_file } if key_file.as_os_str().is_empty() => Err(ValidationError::MissingKeyFile),
            Auth::Key { key_file } if !key_file.exists() => {
                Err(ValidationError::KeyFileNotFound(key_file.clone()))
            }
            Auth::Key { .. } => Ok(()),
        }
    }

    /// 用于展示的副本，密码被遮盖
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Auth::Password { password } = &mut copy.auth {
            if !password.is_empty() {
                *password = REDACTED.to_string();
            }
        }
        copy
    }
}

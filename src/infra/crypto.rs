//! 本机绑定的密码加密
//!
//! 密钥由 `{系统}-{架构}-{用户名}` 指纹经 PBKDF2-HMAC-SHA256 派生 (指纹同时作为
//! password 和 salt)，因此同一台机器同一个用户得到相同密钥，换机器或换用户后
//! 旧的密文无法解开。
//!
//! 密文格式: URL-safe Base64 of `[nonce (12)] [ciphertext+tag]`，AES-256-GCM。

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE as B64, Engine};
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use std::sync::OnceLock;

pub const KDF_ITERATIONS: u32 = 100_000;
pub const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

static MACHINE_KEY: OnceLock<[u8; KEY_SIZE]> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("ciphertext too short")]
    Truncated,
    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,
    #[error("decrypted data is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("cipher error: {0}")]
    Cipher(String),
}

/// 机器/用户指纹
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineFingerprint {
    pub os_family: String,
    pub arch: String,
    pub user: String,
}

impl MachineFingerprint {
    pub fn new(os_family: &str, arch: &str, user: &str) -> Self {
        Self {
            os_family: os_family.to_string(),
            arch: arch.to_string(),
            user: user.to_string(),
        }
    }

    pub fn current() -> Self {
        Self::new(os_family(), std::env::consts::ARCH, &current_user())
    }
}

impl fmt::Display for MachineFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.os_family, self.arch, self.user)
    }
}

fn os_family() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

fn current_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
        .or_else(|| {
            dirs::home_dir()
                .and_then(|home| home.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// PBKDF2-HMAC-SHA256，指纹同时作为 password 和 salt
pub fn derive_key(fingerprint: &MachineFingerprint) -> [u8; KEY_SIZE] {
    let material = fingerprint.to_string();
    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(material.as_bytes(), material.as_bytes(), KDF_ITERATIONS, &mut key);
    key
}

/// 当前机器的密钥，每个进程只派生一次
pub fn machine_key() -> [u8; KEY_SIZE] {
    *MACHINE_KEY.get_or_init(|| derive_key(&MachineFingerprint::current()))
}

#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; KEY_SIZE],
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    pub fn from_key(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    #[allow(dead_code)]
    pub fn for_fingerprint(fingerprint: &MachineFingerprint) -> Self {
        Self::from_key(derive_key(fingerprint))
    }

    pub fn for_this_machine() -> Self {
        Self::from_key(machine_key())
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| CryptoError::Cipher(e.to_string()))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| CryptoError::Cipher(e.to_string()))?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(B64.encode(output))
    }

    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        if token.is_empty() {
            return Ok(String::new());
        }

        let data = B64.decode(token.trim())?;
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Truncated);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::Authentication)?;
        Ok(String::from_utf8(plaintext)?)
    }
}

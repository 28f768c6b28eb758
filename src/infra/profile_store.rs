//! 加密的 profile 存储
//!
//! 磁盘上是 `name -> profile` 的 JSON 对象，只有 `password` 字段是密文；内存中一律
//! 是明文。所有公开操作都不返回错误: 失败只记日志，并通过返回值 (bool / Option)
//! 体现。无法解析的条目原样保留，写盘时一并写回。

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::profile::{Auth, Profile};
use crate::infra::crypto::SecretCipher;

pub type ProfileMap = IndexMap<String, Profile>;

pub struct ProfileStore {
    path: PathBuf,
    cipher: SecretCipher,
    profiles: ProfileMap,
    unreadable: HashSet<String>,
    /// 解析失败的原始条目
    unparsed: IndexMap<String, Value>,
}

impl ProfileStore {
    /// 使用本机密钥打开 (文件不存在视为空存储)
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_cipher(path, SecretCipher::for_this_machine())
    }

    pub fn with_cipher(path: impl Into<PathBuf>, cipher: SecretCipher) -> Self {
        let mut store = Self {
            path: path.into(),
            cipher,
            profiles: ProfileMap::new(),
            unreadable: HashSet::new(),
            unparsed: IndexMap::new(),
        };
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 按文件 / 插入顺序
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn get_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// 加载时密码无法解密 (已被置空) 的 profile
    pub fn has_unreadable_secret(&self, name: &str) -> bool {
        self.unreadable.contains(name)
    }

    /// 新建或覆盖，返回值表示是否成功写盘
    pub fn save_profile(&mut self, name: &str, profile: Profile) -> bool {
        self.unreadable.remove(name);
        self.unparsed.shift_remove(name);
        self.profiles.insert(name.to_string(), profile);
        self.flush()
    }

    pub fn delete_profile(&mut self, name: &str) -> bool {
        let removed = self.profiles.shift_remove(name).is_some();
        let removed_raw = self.unparsed.shift_remove(name).is_some();
        if !removed && !removed_raw {
            return false;
        }
        self.unreadable.remove(name);
        self.flush();
        true
    }

    /// 导出为明文 JSON (密码不加密，用于迁移到其他机器)
    pub fn export_profiles(&self, export_file: &Path) -> bool {
        let result = serde_json::to_string_pretty(&self.profiles)
            .context("Failed to serialize profiles")
            .and_then(|content| {
                fs::write(export_file, content)
                    .with_context(|| format!("Failed to write export file {:?}", export_file))
            });
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not export profiles: {:#}", e);
                false
            }
        }
    }

    /// 导入明文 JSON，同名 profile 整条覆盖
    pub fn import_profiles(&mut self, import_file: &Path) -> bool {
        let imported = match read_plain_profiles(import_file) {
            Ok(imported) => imported,
            Err(e) => {
                warn!("Could not import profiles: {:#}", e);
                return false;
            }
        };
        debug!("Importing {} profiles from {:?}", imported.len(), import_file);
        for (name, profile) in imported {
            self.unreadable.remove(&name);
            self.unparsed.shift_remove(&name);
            self.profiles.insert(name, profile);
        }
        self.flush()
    }

    fn load(&mut self) {
        if !self.path.exists() {
            return;
        }
        match self.read_document() {
            Ok(profiles) => self.profiles = profiles,
            Err(e) => {
                warn!("Could not load profiles: {:#}", e);
                self.profiles.clear();
                self.unreadable.clear();
                self.unparsed.clear();
            }
        }
    }

    fn read_document(&mut self) -> Result<ProfileMap> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read profiles file {:?}", self.path))?;
        let document: IndexMap<String, Value> = serde_json::from_str(&content)
            .with_context(|| format!("Profiles file {:?} is not a JSON object", self.path))?;

        let mut profiles = ProfileMap::with_capacity(document.len());
        for (name, value) in document {
            let mut profile: Profile = match serde_json::from_value(with_default_auth_method(value.clone())) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Skipping malformed profile '{}' (kept on disk as is): {}", name, e);
                    self.unparsed.insert(name, value);
                    continue;
                }
            };
            if let Auth::Password { password } = &mut profile.auth {
                match self.cipher.decrypt(password) {
                    Ok(plain) => *password = plain,
                    Err(e) => {
                        warn!("Password for profile '{}' could not be decrypted: {}", name, e);
                        password.clear();
                        self.unreadable.insert(name.clone());
                    }
                }
            }
            profiles.insert(name, profile);
        }
        Ok(profiles)
    }

    /// 写盘，内存中的数据不会被修改
    fn flush(&self) -> bool {
        match self.write_document() {
            Ok(()) => true,
            Err(e) => {
                warn!("Error saving profiles: {:#}", e);
                false
            }
        }
    }

    fn write_document(&self) -> Result<()> {
        let mut document: IndexMap<String, Value> = IndexMap::with_capacity(self.profiles.len() + self.unparsed.len());
        for (name, profile) in &self.profiles {
            let mut profile = profile.clone();
            if let Auth::Password { password } = &mut profile.auth {
                *password = self
                    .cipher
                    .encrypt(password)
                    .with_context(|| format!("Failed to encrypt password for '{}'", name))?;
            }
            let value = serde_json::to_value(&profile)
                .with_context(|| format!("Failed to serialize profile '{}'", name))?;
            document.insert(name.clone(), value);
        }
        for (name, raw) in &self.unparsed {
            document.entry(name.clone()).or_insert_with(|| raw.clone());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }

        let content = serde_json::to_string_pretty(&document).context("Failed to serialize profiles")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write profiles file {:?}", self.path))?;
        debug!("Saved {} profiles to {:?}", document.len(), self.path);
        Ok(())
    }
}

fn read_plain_profiles(path: &Path) -> Result<ProfileMap> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let document: IndexMap<String, Value> =
        serde_json::from_str(&content).with_context(|| format!("{:?} is not a valid profiles file", path))?;
    document
        .into_iter()
        .map(|(name, value)| {
            let profile: Profile = serde_json::from_value(with_default_auth_method(value))
                .with_context(|| format!("Profile '{}' in {:?} is invalid", name, path))?;
            Ok::<_, anyhow::Error>((name, profile))
        })
        .collect()
}

/// 旧记录可能没有 auth_method: 只有 key_file 时按 key，其余按 password
fn with_default_auth_method(mut value: Value) -> Value {
    if let Value::Object(fields) = &mut value {
        if !fields.contains_key("auth_method") {
            let method = if fields.contains_key("key_file") && !fields.contains_key("password") {
                "key"
            } else {
                "password"
            };
            fields.insert("auth_method".to_string(), Value::from(method));
        }
    }
    value
}

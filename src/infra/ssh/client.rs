use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD_NO_PAD as B64, Engine};
use log::{info, warn};
use ssh2::{HashType, Session};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use super::auth;
use crate::domain::profile::Profile;

/// 远程命令的执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_status: i32,
    /// stdout 与 stderr 合并后的输出
    pub output: String,
}

/// 远程主机能力 (方便测试和未来扩展其他传输方式)
pub trait RemoteHost {
    /// 确保远程目录存在，不存在则递归创建
    fn ensure_dir(&mut self, dir: &str) -> Result<()>;

    /// 上传文件，回调参数为 (已传字节, 总字节)，返回已传字节数
    fn upload(
        &mut self,
        local_path: &Path,
        remote_path: &str,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<u64>;

    /// 执行命令并等待结束
    fn exec(&mut self, command: &str) -> Result<CommandOutput>;
}

/// 已认证的 SSH 会话
pub struct SshClient {
    session: Session,
}

impl SshClient {
    /// 建立 SSH 连接。未知主机密钥自动接受 (首次信任)
    pub fn connect(profile: &Profile, timeout: Duration) -> Result<Self> {
        info!(
            "Connecting to {}:{} (user: {})...",
            profile.host, profile.port, profile.username
        );

        let addr = (profile.host.as_str(), profile.port)
            .to_socket_addrs()
            .with_context(|| format!("Could not resolve {}:{}", profile.host, profile.port))?
            .next()
            .ok_or_else(|| anyhow!("No address found for {}:{}", profile.host, profile.port))?;

        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .with_context(|| format!("TCP connection to {} failed", addr))?;

        let mut session = Session::new().context("Failed to create SSH session")?;
        session.set_tcp_stream(tcp);
        session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
        session.handshake().context("SSH handshake failed")?;

        match session.host_key_hash(HashType::Sha256) {
            Some(hash) => info!("Accepting host key SHA256:{} for {}", B64.encode(hash), profile.host),
            None => warn!("Server {} did not present a host key hash", profile.host),
        }

        auth::authenticate(&session, profile)?;
        info!("Authenticated as {}", profile.username);
        Ok(Self { session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 上传期间放宽超时，大文件的单次写入可能较慢
    pub fn set_io_timeout(&self, timeout: Duration) {
        self.session
            .set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
    }

    pub fn disconnect(self) {
        if let Err(e) = self.session.disconnect(None, "bye", None) {
            warn!("Disconnect failed: {}", e);
        }
    }
}

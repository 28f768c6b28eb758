use anyhow::{bail, Context, Result};
use log::{debug, info};
use ssh2::ExtendedData;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use super::client::{CommandOutput, RemoteHost, SshClient};

const CHUNK_SIZE: usize = 32 * 1024;

/// 单引号转义，用于拼接远程 shell 命令
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// 拼接远程 (POSIX) 路径
pub fn remote_join(dir: &str, name: &str) -> String {
    let dir = dir.replace('\\', "/");
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() && dir.starts_with('/') {
        format!("/{}", name)
    } else if trimmed.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", trimmed, name)
    }
}

/// 远程解压并删除归档
pub fn extract_command(remote_dir: &str, archive_name: &str) -> String {
    format!(
        "cd {dir} && tar -xzf {ar} && rm {ar}",
        dir = shell_quote(remote_dir),
        ar = shell_quote(archive_name)
    )
}

/// 分块复制并回报进度
pub fn copy_with_progress(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    total: u64,
    on_progress: &mut dyn FnMut(u64, u64),
) -> Result<u64> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut transferred = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
        transferred += bytes_read as u64;
        on_progress(transferred, total);
    }
    writer.flush()?;

    if total == 0 {
        on_progress(0, 0);
    }
    Ok(transferred)
}

impl RemoteHost for SshClient {
    fn ensure_dir(&mut self, dir: &str) -> Result<()> {
        let sftp = self.session().sftp().context("Failed to open SFTP session")?;
        if sftp.stat(Path::new(dir)).is_ok() {
            return Ok(());
        }
        drop(sftp);

        info!("Creating remote directory {}", dir);
        let out = self.exec(&format!("mkdir -p {}", shell_quote(dir)))?;
        if out.exit_status != 0 {
            bail!(
                "Could not create remote directory {} (exit code {}): {}",
                dir,
                out.exit_status,
                out.output.trim()
            );
        }
        Ok(())
    }

    fn upload(
        &mut self,
        local_path: &Path,
        remote_path: &str,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<u64> {
        let mut local_file = File::open(local_path)
            .with_context(|| format!("Failed to open local file {:?}", local_path))?;
        let total = local_file.metadata()?.len();

        let sftp = self.session().sftp().context("Failed to open SFTP session")?;
        let mut remote_file = sftp
            .create(Path::new(remote_path))
            .with_context(|| format!("Failed to create remote file {}", remote_path))?;

        debug!("Uploading {:?} ({} bytes) to {}", local_path, total, remote_path);
        copy_with_progress(&mut local_file, &mut remote_file, total, on_progress)
            .with_context(|| format!("Upload to {} failed", remote_path))
    }

    fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        debug!("Executing remote command: {}", command);
        let mut channel = self
            .session()
            .channel_session()
            .context("Failed to open channel")?;
        // stderr 并入 stdout，避免只读一个流时另一个流的窗口被写满而卡住
        channel.handle_extended_data(ExtendedData::Merge)?;
        channel.exec(command).context("Failed to execute remote command")?;

        let mut output = String::new();
        channel.read_to_string(&mut output)?;

        channel.wait_close()?;
        let exit_status = channel.exit_status()?;
        Ok(CommandOutput { exit_status, output })
    }
}

//! 打包 → 上传 → (可选) 远程解压
//!
//! `run_transfer` 同步执行并通过回调发出事件；`spawn_transfer` 把它放到后台线程，
//! 事件经 channel 送回调用方。每次运行恰好产生一个终止事件。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, error, info, warn};

use crate::domain::profile::Profile;
use crate::domain::transfer::{TransferEvent, TransferRequest};
use crate::infra::archive;
use crate::infra::ssh::transfer::{extract_command, remote_join};
use crate::infra::ssh::{RemoteHost, SshClient};
use crate::utils::format_size;

/// 上传阶段的单次 IO 超时
const UPLOAD_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// 后台任务句柄
pub struct TransferHandle {
    pub events: Receiver<TransferEvent>,
    worker: JoinHandle<()>,
}

impl TransferHandle {
    pub fn join(self) {
        if self.worker.join().is_err() {
            error!("Transfer worker panicked");
        }
    }
}

/// 在后台线程通过 SSH 执行传输
pub fn spawn_transfer(request: TransferRequest, connect_timeout: Duration, temp_dir: PathBuf) -> TransferHandle {
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let connect = |profile: &Profile| -> Result<SshClient> {
            let client = SshClient::connect(profile, connect_timeout)?;
            client.set_io_timeout(UPLOAD_IO_TIMEOUT);
            Ok(client)
        };
        run_transfer(&request, &temp_dir, connect, &mut |event| {
            // 接收端已关闭时无需再通知
            let _ = tx.send(event);
        });
    });
    TransferHandle { events: rx, worker }
}

/// 同步执行一次传输，保证只发出一个终止事件
pub fn run_transfer<H, C>(
    request: &TransferRequest,
    temp_dir: &Path,
    connect: C,
    emit: &mut dyn FnMut(TransferEvent),
) where
    H: RemoteHost,
    C: FnOnce(&Profile) -> Result<H>,
{
    let mut archive_path: Option<PathBuf> = None;
    let result = execute(request, temp_dir, connect, &mut archive_path, emit);

    if let Some(path) = archive_path {
        if let Err(e) = fs::remove_file(&path) {
            warn!("Could not remove temporary archive {:?}: {}", path, e);
        }
    }

    match result {
        Ok(()) => {
            info!("Transfer to {}:{} finished", request.profile.host, request.remote_dir);
            emit(TransferEvent::Finished);
        }
        Err(e) => {
            error!("Transfer failed: {:#}", e);
            emit(TransferEvent::Failed(format!("{:#}", e)));
        }
    }
}

fn execute<H, C>(
    request: &TransferRequest,
    temp_dir: &Path,
    connect: C,
    archive_path: &mut Option<PathBuf>,
    emit: &mut dyn FnMut(TransferEvent),
) -> Result<()>
where
    H: RemoteHost,
    C: FnOnce(&Profile) -> Result<H>,
{
    request.validate()?;

    emit(TransferEvent::Message("Creating archive...".into()));
    let local_archive = archive::create_archive(&request.paths, temp_dir)?;
    *archive_path = Some(local_archive.clone());

    let archive_size = fs::metadata(&local_archive)
        .with_context(|| format!("Failed to stat archive {:?}", local_archive))?
        .len();
    emit(TransferEvent::Message(format!("Archive created: {}", format_size(archive_size))));

    emit(TransferEvent::Message("Preparing to upload archive...".into()));
    let mut host = connect(&request.profile)?;
    host.ensure_dir(&request.remote_dir)?;

    let archive_name = local_archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Archive path has no file name"))?;
    let remote_file = remote_join(&request.remote_dir, &archive_name);

    let transferred = host.upload(&local_archive, &remote_file, &mut |done, total| {
        emit(TransferEvent::Progress { transferred: done, total })
    })?;
    emit(TransferEvent::Message(format!("Upload completed: {} transferred", format_size(transferred))));

    if request.extract {
        emit(TransferEvent::Message("Extracting archive on remote server...".into()));
        let out = host.exec(&extract_command(&request.remote_dir, &archive_name))?;
        if out.exit_status != 0 {
            bail!("Extraction failed with exit code {}: {}", out.exit_status, out.output.trim());
        }
        if !out.output.trim().is_empty() {
            debug!("Extraction output: {}", out.output.trim());
        }
    }

    emit(TransferEvent::Message("Cleaning up...".into()));
    Ok(())
}

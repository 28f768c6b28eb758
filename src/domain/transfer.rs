use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::profile::{Profile, ValidationError};

/// 一次打包上传任务的输入
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// 连接参数
    pub profile: Profile,
    /// 本地文件/目录，按顺序打包
    pub paths: Vec<PathBuf>,
    /// 远程目标目录
    pub remote_dir: String,
    /// 上传后是否在远程解压
    pub extract: bool,
}

impl TransferRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.profile.validate()?;
        if self.paths.is_empty() {
            return Err(ValidationError::NoPaths);
        }
        if self.remote_dir.trim().is_empty() {
            return Err(ValidationError::MissingRemotePath);
        }
        Ok(())
    }
}

/// 执行器发出的事件，每次运行以 Finished 或 Failed 结束且只出现一次
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Message(String),
    Progress { transferred: u64, total: u64 },
    Finished,
    Failed(String),
}

impl TransferEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferEvent::Finished | TransferEvent::Failed(_))
    }
}

/// 传输任务状态
#[derive(Debug, Clone, PartialEq)]
pub enum TransferStatus {
    Pending,
    InProgress,
    Completed,
    Failed(String),
}

/// 根据事件流跟踪任务状态
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub status: TransferStatus,
    pub transferred: u64,
    pub total: u64,
    pub started_at: Option<Instant>,
}

impl TransferJob {
    pub fn new() -> Self {
        Self {
            status: TransferStatus::Pending,
            transferred: 0,
            total: 0,
            started_at: None,
        }
    }

    pub fn apply(&mut self, event: &TransferEvent) {
        // 终止后的事件一律忽略
        if self.is_done() {
            return;
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        match event {
            TransferEvent::Message(_) => self.status = TransferStatus::InProgress,
            TransferEvent::Progress { transferred, total } => {
                self.status = TransferStatus::InProgress;
                self.transferred = *transferred;
                self.total = *total;
            }
            TransferEvent::Finished => self.status = TransferStatus::Completed,
            TransferEvent::Failed(e) => self.status = TransferStatus::Failed(e.clone()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// 上传进度百分比，尚未开始上传时为 None
    pub fn upload_percent(&self) -> Option<u64> {
        match self.total {
            0 => None,
            total => Some(self.transferred.min(total) * 100 / total),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, TransferStatus::Completed | TransferStatus::Failed(_))
    }
}

impl Default for TransferJob {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TransferRequest {
        TransferRequest {
            profile: Profile::with_password("h", 22, "u", "p", "/srv"),
            paths: vec![PathBuf::from("a.txt")],
            remote_dir: "/srv".into(),
            extract: true,
        }
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(request().validate(), Ok(()));

        let mut r = request();
        r.paths.clear();
        assert_eq!(r.validate(), Err(ValidationError::NoPaths));

        let mut r = request();
        r.remote_dir = " ".into();
        assert_eq!(r.validate(), Err(ValidationError::MissingRemotePath));

        let mut r = request();
        r.profile.username.clear();
        assert_eq!(r.validate(), Err(ValidationError::MissingUsername));
    }

    #[test]
    fn test_job_starts_pending() {
        let job = TransferJob::new();
        assert_eq!(job.status, TransferStatus::Pending);
        assert_eq!(job.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_job_tracks_progress() {
        let mut job = TransferJob::new();
        job.apply(&TransferEvent::Message("Creating archive...".into()));
        job.apply(&TransferEvent::Progress { transferred: 512, total: 1024 });
        assert_eq!(job.status, TransferStatus::InProgress);
        assert_eq!((job.transferred, job.total), (512, 1024));
        assert_eq!(job.upload_percent(), Some(50));
        assert!(job.started_at.is_some());
    }

    #[test]
    fn test_upload_percent_before_upload() {
        let mut job = TransferJob::new();
        assert_eq!(job.upload_percent(), None);
        job.apply(&TransferEvent::Progress { transferred: 0, total: 0 });
        assert_eq!(job.upload_percent(), None);
        job.apply(&TransferEvent::Progress { transferred: 3000, total: 3000 });
        assert_eq!(job.upload_percent(), Some(100));
    }

    #[test]
    fn test_job_terminal_state_is_sticky() {
        let mut job = TransferJob::new();
        job.apply(&TransferEvent::Failed("timeout".into()));
        job.apply(&TransferEvent::Finished);
        assert_eq!(job.status, TransferStatus::Failed("timeout".into()));
        assert!(job.is_done());
    }

    #[test]
    fn test_job_completed() {
        let mut job = TransferJob::new();
        job.apply(&TransferEvent::Finished);
        assert_eq!(job.status, TransferStatus::Completed);
        assert!(TransferEvent::Finished.is_terminal());
        assert!(!TransferEvent::Message("x".into()).is_terminal());
    }
}

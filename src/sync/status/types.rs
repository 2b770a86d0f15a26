use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RunStartStatusMessage {
    pub course_count: usize,
}

#[derive(Debug, Clone)]
pub struct CourseIndexedStatusMessage {
    pub course: String,
    pub refetch_count: usize,
}

#[derive(Debug, Clone)]
pub struct CourseSkippedStatusMessage {
    pub course: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct FileListStatusMessage {
    pub course: String,
    pub category: String,
    pub file_count: usize,
}

#[derive(Debug, Clone)]
pub struct DownloadStartStatusMessage {
    pub course: String,
    pub file_count: usize,
    pub total_size: u64,
}

#[derive(Debug, Clone)]
pub struct DownloadFileStatusMessage {
    pub file_path: PathBuf,
    pub file_size: u64,
    pub success: bool,
}

#[derive(Debug, Default, Clone)]
pub struct CommitFinishStatusMessage {
    pub written: usize,
    pub failed: usize,
}

#[derive(Clone, Debug)]
pub enum StatusMessage {
    RunStart(RunStartStatusMessage),
    CourseIndexed(CourseIndexedStatusMessage),
    CourseSkipped(CourseSkippedStatusMessage),
    FileListFetched(FileListStatusMessage),
    DownloadStart(DownloadStartStatusMessage),
    DownloadFile(DownloadFileStatusMessage),
    CommitStart,
    CommitFinish(CommitFinishStatusMessage),
    RunFinish,
}

pub type StatusSender = Arc<dyn Fn(StatusMessage) + Send + Sync>;

/// Status sender that drops every message.
pub fn silent() -> StatusSender {
    Arc::new(|_msg: StatusMessage| {})
}

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for '{url}'")]
    HttpStatus { status: u16, url: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Cache record error at {}: {reason}", path.display())]
    Cache { path: PathBuf, reason: String },

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Refusing to use '{0}' as a file or folder name")]
    UnsafeName(String),

    #[error("Worker panicked: {0}")]
    Worker(String),

    #[error("No academic year available for this user")]
    NoAcademicYear,

    #[error("Academic year {0} not found")]
    YearNotFound(i32),

    #[error("Course {id} not found in {year}")]
    CourseNotFound { id: u32, year: i32 },
}

impl SyncError {
    /// Whether a retry at the transport level could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Http(err) => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            }
            SyncError::HttpStatus { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            // a response body that stalls or is cut off surfaces from io::copy
            SyncError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::TimedOut
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

//! Interfaces to the remote document repository.
//!
//! The sync engine only talks to the remote through [`RemoteIndex`] (course
//! listings, category counts and file lists) and [`Downloader`] (file
//! transfer). Implementations are expected to retry transient faults
//! themselves.

use crate::counts::CategoryCount;
use crate::error::{Result, SyncError};
use crate::model::{known_category_id, Course, DownloadTask, FileDescriptor, SemesterKind};

pub mod http;
pub mod manifest;

pub use http::{HttpDownloader, RetryPolicy};
pub use manifest::ManifestRemote;

pub trait RemoteIndex: Send + Sync {
    /// Academic years the user has courses in.
    fn academic_years(&self) -> Result<Vec<i32>>;

    fn list_courses(&self, year: i32) -> Result<Vec<Course>>;

    /// Per-category file counts for a course. Categories without files are
    /// left out.
    fn fetch_category_counts(&self, course: &Course) -> Result<CategoryCount>;

    fn fetch_file_list(&self, course: &Course, category_id: &str) -> Result<Vec<FileDescriptor>>;

    /// Remote id of a category within `course`.
    fn category_id(&self, _course: &Course, category: &str) -> String {
        known_category_id(category)
    }

    fn find_course(&self, id: u32, year: i32, semester: u8, kind: SemesterKind) -> Result<Course> {
        self.list_courses(year)?
            .into_iter()
            .find(|c| c.id == id && c.semester == semester && c.kind == kind)
            .ok_or(SyncError::CourseNotFound { id, year })
    }
}

pub trait Downloader: Send + Sync {
    /// Transfers one file and returns the number of bytes written. On success
    /// the destination's modification time equals `task.modified`.
    fn download_file(&self, task: &DownloadTask) -> Result<u64>;
}

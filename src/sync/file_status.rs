use crate::error::Result;
use crate::model::{safe_component, DownloadTask, FileDescriptor};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Local copy is at least as new as the remote one.
    Synced,
    /// Local copy exists but is older than the remote one.
    Stale,
    /// No local copy.
    Missing,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Stale => "stale",
            SyncStatus::Missing => "missing",
        };
        write!(f, "{}", s)
    }
}

pub fn sync_status(descriptor: &FileDescriptor, folder: &Path) -> SyncStatus {
    let path = folder.join(&descriptor.name);
    let metadata = match fs::metadata(&path) {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return SyncStatus::Missing,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("Could not read '{}': {}", path.display(), err);
            }
            return SyncStatus::Missing;
        }
    };

    match metadata.modified() {
        Ok(local) if local >= descriptor.modified_system_time() => SyncStatus::Synced,
        Ok(_) => SyncStatus::Stale,
        Err(err) => {
            warn!("No modification time for '{}': {}", path.display(), err);
            SyncStatus::Stale
        }
    }
}

/// Decides whether a remote file must be transferred into `folder`. Names
/// that are not a single plain path component are rejected.
pub fn plan_download(
    descriptor: &FileDescriptor,
    folder: &Path,
) -> Result<(SyncStatus, Option<DownloadTask>)> {
    safe_component(&descriptor.name)?;
    let status = sync_status(descriptor, folder);
    let task = match status {
        SyncStatus::Synced => {
            debug!("Found {} in '{}', skipping", descriptor.name, folder.display());
            None
        }
        SyncStatus::Stale | SyncStatus::Missing => {
            if status == SyncStatus::Stale {
                info!(
                    "'{}' is out of date and will be downloaded again",
                    folder.join(&descriptor.name).display()
                );
            }
            Some(DownloadTask {
                destination: folder.join(&descriptor.name),
                link: descriptor.link.clone(),
                expected_size: descriptor.size,
                modified: descriptor.modified,
            })
        }
    };
    Ok((status, task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use chrono::{TimeZone, Utc};
    use filetime::{set_file_mtime, FileTime};
    use tempfile::tempdir;

    fn descriptor(secs: i64) -> FileDescriptor {
        FileDescriptor {
            name: "lecture01.pdf".to_string(),
            link: "https://example.org/doc?id=1".to_string(),
            size: 4,
            modified: Utc.timestamp_opt(secs, 0).unwrap(),
            category: "Slides".to_string(),
        }
    }

    const T: i64 = 1_700_000_000;

    #[test]
    fn missing_when_no_local_file() {
        let dir = tempdir().unwrap();
        assert_eq!(sync_status(&descriptor(T), dir.path()), SyncStatus::Missing);
    }

    #[test]
    fn stale_when_one_second_older() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lecture01.pdf");
        fs::write(&path, "data").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(T - 1, 0)).unwrap();

        assert_eq!(sync_status(&descriptor(T), dir.path()), SyncStatus::Stale);
    }

    #[test]
    fn synced_when_same_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lecture01.pdf");
        fs::write(&path, "data").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(T, 0)).unwrap();

        assert_eq!(sync_status(&descriptor(T), dir.path()), SyncStatus::Synced);
    }

    #[test]
    fn directory_with_file_name_counts_as_missing() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("lecture01.pdf")).unwrap();
        assert_eq!(sync_status(&descriptor(T), dir.path()), SyncStatus::Missing);
    }

    #[test]
    fn plan_builds_task_for_stale_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lecture01.pdf");
        fs::write(&path, "data").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(T - 60, 0)).unwrap();

        let (status, task) = plan_download(&descriptor(T), dir.path()).unwrap();
        assert_eq!(status, SyncStatus::Stale);
        let task = task.unwrap();
        assert_eq!(task.destination, path);
        assert_eq!(task.expected_size, 4);
    }

    #[test]
    fn plan_rejects_names_leaving_the_folder() {
        let dir = tempdir().unwrap();
        let slides = dir.path().join("Algebra").join("Slides");
        let mut escaping = descriptor(T);
        escaping.name = "../../../escape.pdf".to_string();

        assert!(matches!(
            plan_download(&escaping, &slides),
            Err(SyncError::UnsafeName(_))
        ));

        escaping.name = "/tmp/escape.pdf".to_string();
        assert!(plan_download(&escaping, &slides).is_err());
    }
}

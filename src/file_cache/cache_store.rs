use crate::counts::CategoryCount;
use crate::error::{Result, SyncError};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::*;

pub static CACHE_FILE_NAME: &str = ".cache.json";
static CACHE_TMP_FILE_NAME: &str = ".cache.json.tmp";

/// A cache record waiting for [`CacheStore::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub folder: PathBuf,
    pub counts: CategoryCount,
}

#[derive(Debug)]
pub struct CommitFailure {
    pub folder: PathBuf,
    pub cause: SyncError,
}

#[derive(Debug, Default)]
pub struct CommitReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<CommitFailure>,
}

/// Per-course-folder record of the last remote counts that were synced.
///
/// New records are stashed in memory while a run is in progress and only
/// written by a single `commit` at the very end, so an interrupted run leaves
/// every record as it was.
#[derive(Debug, Default)]
pub struct CacheStore {
    pending: Mutex<Vec<PendingWrite>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// Loads the record for a course folder. A missing record is the normal
    /// first-run state; an unreadable one is treated the same way.
    pub fn load(&self, folder: &Path) -> Option<CategoryCount> {
        let path = Self::cache_path(folder);
        match read_record(&path) {
            Ok(counts) => {
                debug!("Cached counts for '{}': {}", folder.display(), counts);
                Some(counts)
            }
            Err(SyncError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                info!("No cached counts for '{}' yet", folder.display());
                None
            }
            Err(err) => {
                warn!("Ignoring cache record, all categories will be checked: {}", err);
                None
            }
        }
    }

    pub fn stash(&self, folder: &Path, counts: CategoryCount) {
        trace!("Stashing counts for '{}': {}", folder.display(), counts);
        self.lock_pending().push(PendingWrite {
            folder: folder.to_path_buf(),
            counts,
        });
    }

    pub fn pending(&self) -> Vec<PendingWrite> {
        self.lock_pending().clone()
    }

    /// Writes every stashed record and clears the stash. A failure for one
    /// folder is reported and does not stop the others.
    pub fn commit(&self) -> CommitReport {
        let pending: Vec<PendingWrite> = std::mem::take(&mut *self.lock_pending());
        let mut report = CommitReport::default();

        for write in pending {
            match write_record(&write.folder, &write.counts) {
                Ok(()) => {
                    debug!("Cache updated for '{}'", write.folder.display());
                    report.written.push(write.folder);
                }
                Err(cause) => {
                    error!(
                        "Failed to update cache for '{}': {}",
                        write.folder.display(),
                        cause
                    );
                    report.failed.push(CommitFailure {
                        folder: write.folder,
                        cause,
                    });
                }
            }
        }

        report
    }

    fn lock_pending(&self) -> MutexGuard<'_, Vec<PendingWrite>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_record(path: &Path) -> Result<CategoryCount> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| SyncError::Cache {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_record(folder: &Path, counts: &CategoryCount) -> Result<()> {
    fs::create_dir_all(folder)?;

    let path = CacheStore::cache_path(folder);
    let temp_path = folder.join(CACHE_TMP_FILE_NAME);

    let contents = serde_json::to_string_pretty(counts).map_err(|e| SyncError::Cache {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    // the old record stays intact until the new one is fully on disk
    let mut file = File::create(&temp_path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, &path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_record_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(CacheStore::new().load(dir.path()), None);
    }

    #[test]
    fn malformed_record_is_none() {
        let dir = tempdir().unwrap();
        fs::write(CacheStore::cache_path(dir.path()), "{\"Slides\": -2}").unwrap();
        assert_eq!(CacheStore::new().load(dir.path()), None);

        fs::write(CacheStore::cache_path(dir.path()), "not json").unwrap();
        assert_eq!(CacheStore::new().load(dir.path()), None);
    }

    #[test]
    fn stash_does_not_touch_disk() {
        let dir = tempdir().unwrap();
        let path = CacheStore::cache_path(dir.path());
        fs::write(&path, "{\"Slides\": 2}").unwrap();
        let before = fs::read(&path).unwrap();

        let store = CacheStore::new();
        store.stash(dir.path(), CategoryCount::new().with("Slides", 5));
        drop(store);

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn commit_writes_and_drains() {
        let dir = tempdir().unwrap();
        let course = dir.path().join("2024").join("1S").join("Algebra");
        let counts = CategoryCount::new().with("Slides", 3).with("Exams", 1);

        let store = CacheStore::new();
        store.stash(&course, counts.clone());
        let report = store.commit();

        assert_eq!(report.written, vec![course.clone()]);
        assert!(report.failed.is_empty());
        assert_eq!(store.load(&course), Some(counts));
        assert!(!course.join(CACHE_TMP_FILE_NAME).exists());

        // second commit has nothing left to write
        let again = store.commit();
        assert!(again.written.is_empty());
    }

    #[test]
    fn commit_overwrites_previous_record() {
        let dir = tempdir().unwrap();
        fs::write(CacheStore::cache_path(dir.path()), "{\"Slides\": 9, \"Old\": 1}").unwrap();

        let store = CacheStore::new();
        store.stash(dir.path(), CategoryCount::new().with("Slides", 3));
        store.commit();

        assert_eq!(
            store.load(dir.path()),
            Some(CategoryCount::new().with("Slides", 3))
        );
    }

    #[test]
    fn one_failing_folder_does_not_block_others() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "a file where a folder should be").unwrap();
        let good = dir.path().join("good");

        let store = CacheStore::new();
        store.stash(&blocker.join("course"), CategoryCount::new().with("A", 1));
        store.stash(&good, CategoryCount::new().with("B", 2));
        let report = store.commit();

        assert_eq!(report.written, vec![good.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(store.load(&good), Some(CategoryCount::new().with("B", 2)));
    }
}

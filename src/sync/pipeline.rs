use super::file_status::{plan_download, SyncStatus};
use super::inventory::count_local_files;
use super::pool::{BoundedWorkPool, ItemFailure};
use super::reconcile::{reconcile, Reconciliation};
use super::status::*;
use crate::counts::CategoryCount;
use crate::error::{Result, SyncError};
use crate::file_cache::{CacheStore, CommitReport};
use crate::model::{safe_component, Course, DownloadTask, FileDescriptor, SyncTask};
use crate::remote::{Downloader, RemoteIndex};
use crate::utils::stats::StatsTimer;
use colored::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseState {
    Success,
    /// Some file lists or downloads failed; the rest of the course went through.
    PartialFailure,
    /// The course index could not be read at all.
    Skipped,
}

#[derive(Debug)]
pub struct CourseReport {
    pub course: Course,
    pub folder: PathBuf,
    pub state: CourseState,
    pub skip_reason: Option<String>,
    pub remote: CategoryCount,
    pub reconciliation: Reconciliation,
    pub files_listed: usize,
    pub synced: usize,
    pub stale: usize,
    pub missing: usize,
    pub downloaded: Vec<PathBuf>,
    pub downloaded_size: u64,
    pub failures: Vec<ItemFailure>,
    pub timer: StatsTimer,
}

impl CourseReport {
    fn new(course: &Course, folder: PathBuf) -> Self {
        Self {
            course: course.clone(),
            folder,
            state: CourseState::Success,
            skip_reason: None,
            remote: CategoryCount::new(),
            reconciliation: Reconciliation::default(),
            files_listed: 0,
            synced: 0,
            stale: 0,
            missing: 0,
            downloaded: Vec::new(),
            downloaded_size: 0,
            failures: Vec::new(),
            timer: StatsTimer::new(),
        }
    }

    fn finish(mut self) -> Self {
        if self.state != CourseState::Skipped && !self.failures.is_empty() {
            self.state = CourseState::PartialFailure;
        }
        self.timer.finish();
        self
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub courses: Vec<CourseReport>,
    pub commit: CommitReport,
    pub timer: StatsTimer,
}

impl RunReport {
    pub fn refetched_categories(&self) -> usize {
        self.courses
            .iter()
            .map(|c| c.reconciliation.categories().len())
            .sum()
    }

    pub fn downloaded_count(&self) -> usize {
        self.courses.iter().map(|c| c.downloaded.len()).sum()
    }

    pub fn downloaded_size(&self) -> u64 {
        self.courses.iter().map(|c| c.downloaded_size).sum()
    }

    /// Folders that received at least one file during the run.
    pub fn downloaded_folders(&self) -> BTreeSet<PathBuf> {
        self.courses
            .iter()
            .flat_map(|c| c.downloaded.iter())
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect()
    }

    pub fn count_in_state(&self, state: CourseState) -> usize {
        self.courses.iter().filter(|c| c.state == state).count()
    }
}

/// Drives the per-course pipeline and the single cache commit at the end of
/// a run.
pub struct SyncEngine {
    remote: Arc<dyn RemoteIndex>,
    downloader: Arc<dyn Downloader>,
    cache: CacheStore,
    root: PathBuf,
    metadata_pool: BoundedWorkPool,
    download_pool: BoundedWorkPool,
    tx_status: StatusSender,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteIndex>,
        downloader: Arc<dyn Downloader>,
        root: PathBuf,
        scan_threads: usize,
        download_threads: usize,
        tx_status: StatusSender,
    ) -> Result<Self> {
        Ok(Self {
            remote,
            downloader,
            cache: CacheStore::new(),
            root,
            metadata_pool: BoundedWorkPool::new("scan", scan_threads)?,
            download_pool: BoundedWorkPool::new("download", download_threads)?,
            tx_status,
        })
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Syncs every course, then commits the stashed cache records once.
    pub fn run(&self, courses: Vec<Course>) -> RunReport {
        let mut timer = StatsTimer::new();
        (self.tx_status)(StatusMessage::RunStart(RunStartStatusMessage {
            course_count: courses.len(),
        }));

        let pool_report = self
            .metadata_pool
            .run(courses, |course| Ok(self.sync_course(course)));
        // sync_course never fails, it reports
        let courses = pool_report.results;

        (self.tx_status)(StatusMessage::CommitStart);
        let commit = self.commit();
        (self.tx_status)(StatusMessage::CommitFinish(CommitFinishStatusMessage {
            written: commit.written.len(),
            failed: commit.failed.len(),
        }));

        timer.finish();
        (self.tx_status)(StatusMessage::RunFinish);

        RunReport {
            courses,
            commit,
            timer,
        }
    }

    /// Writes all stashed cache records. Must only run after every course has
    /// finished.
    pub fn commit(&self) -> CommitReport {
        let commit_timer = StatsTimer::new();
        let report = self.cache.commit();
        debug!(
            "Cache commit completed in {} seconds",
            format!("{:.2}", commit_timer.get_elapsed().as_secs_f64()).green()
        );
        report
    }

    pub fn sync_course(&self, course: &Course) -> CourseReport {
        let folder = course.folder(&self.root);
        let mut report = CourseReport::new(course, folder.clone());
        info!("Looking for documents in {}", course.name);

        // 1) remote index
        let remote = match safe_component(&course.name)
            .and_then(|_| self.remote.fetch_category_counts(course))
        {
            Ok(counts) => counts,
            Err(err) => {
                warn!("Skipping {}: could not read its index: {}", course.name, err);
                (self.tx_status)(StatusMessage::CourseSkipped(CourseSkippedStatusMessage {
                    course: course.name.clone(),
                    reason: err.to_string(),
                }));
                report.state = CourseState::Skipped;
                report.skip_reason = Some(err.to_string());
                return report.finish();
            }
        };
        report.remote = remote.clone();

        if remote.is_empty() {
            info!("No documents found in {}", course.name);
            self.send_indexed(course, 0);
            return report.finish();
        }
        debug!("Remote counts for {}: {}", course.name, remote);

        // 2) three-way diff
        let cached = self.cache.load(&folder);
        let local = count_local_files(&folder).unwrap_or_else(|err| {
            warn!(
                "Could not count files in '{}', assuming none: {}",
                folder.display(),
                err
            );
            CategoryCount::new()
        });
        let reconciliation = reconcile(&remote, cached.as_ref(), &local);
        self.log_reconciliation(course, &reconciliation, cached.as_ref(), &local);
        self.send_indexed(course, reconciliation.categories().len());

        if reconciliation.is_empty() {
            debug!("No changes for {}", course.name);
            report.reconciliation = reconciliation;
            return report.finish();
        }

        // 3) record intent, written only at commit
        self.cache.stash(&folder, remote);

        // 4) file lists
        let mut tasks: Vec<SyncTask> = Vec::new();
        for category in reconciliation.categories() {
            if let Err(cause) = safe_component(&category) {
                self.reject(&mut report, format!("{} > {}", course, category), cause);
                continue;
            }
            tasks.push(SyncTask {
                category_id: self.remote.category_id(course, &category),
                category,
                course: course.clone(),
                folder: folder.clone(),
            });
        }
        report.reconciliation = reconciliation;

        let listing = self.metadata_pool.run(tasks, |task| self.fetch_file_list(task));
        report.failures.extend(listing.failures);
        let descriptors: Vec<FileDescriptor> = listing.results.into_iter().flatten().collect();
        report.files_listed = descriptors.len();

        // 5) per-file decision
        let mut downloads: Vec<DownloadTask> = Vec::new();
        for descriptor in &descriptors {
            let planned = safe_component(&descriptor.category)
                .and_then(|category| plan_download(descriptor, &folder.join(category)));
            let (status, task) = match planned {
                Ok(planned) => planned,
                Err(cause) => {
                    let item = format!("{} > {} > {}", course, descriptor.category, descriptor.name);
                    self.reject(&mut report, item, cause);
                    continue;
                }
            };
            match status {
                SyncStatus::Synced => report.synced += 1,
                SyncStatus::Stale => report.stale += 1,
                SyncStatus::Missing => report.missing += 1,
            }
            downloads.extend(task);
        }
        debug!("{} files to download for {}", downloads.len(), course.name);

        if downloads.is_empty() {
            return report.finish();
        }

        // 6) downloads
        (self.tx_status)(StatusMessage::DownloadStart(DownloadStartStatusMessage {
            course: course.name.clone(),
            file_count: downloads.len(),
            total_size: downloads.iter().map(|t| t.expected_size).sum(),
        }));
        let transfer = self.download_pool.run(downloads, |task| self.download(task));
        report.failures.extend(transfer.failures);
        for (path, size) in transfer.results {
            report.downloaded_size += size;
            report.downloaded.push(path);
        }

        report.finish()
    }

    fn fetch_file_list(&self, task: &SyncTask) -> Result<Vec<FileDescriptor>> {
        debug!("Looking for {}", task);
        let files = self.remote.fetch_file_list(&task.course, &task.category_id)?;
        trace!("Files of {}: {:?}", task, files);
        (self.tx_status)(StatusMessage::FileListFetched(FileListStatusMessage {
            course: task.course.name.clone(),
            category: task.category.clone(),
            file_count: files.len(),
        }));
        Ok(files)
    }

    fn download(&self, task: &DownloadTask) -> Result<(PathBuf, u64)> {
        let result = self.downloader.download_file(task);
        (self.tx_status)(StatusMessage::DownloadFile(DownloadFileStatusMessage {
            file_path: task.destination.clone(),
            file_size: *result.as_ref().unwrap_or(&0),
            success: result.is_ok(),
        }));
        result.map(|size| (task.destination.clone(), size))
    }

    fn reject(&self, report: &mut CourseReport, item: String, cause: SyncError) {
        error!("Not syncing {}: {}", item, cause);
        report.failures.push(ItemFailure { item, cause });
    }

    fn send_indexed(&self, course: &Course, refetch_count: usize) {
        (self.tx_status)(StatusMessage::CourseIndexed(CourseIndexedStatusMessage {
            course: course.name.clone(),
            refetch_count,
        }));
    }

    fn log_reconciliation(
        &self,
        course: &Course,
        reconciliation: &Reconciliation,
        cached: Option<&CategoryCount>,
        local: &CategoryCount,
    ) {
        if !reconciliation.remote_changed.is_empty() {
            info!(
                "Categories of {} with new files on the server: {:?}",
                course.name, reconciliation.remote_changed
            );
        }
        if !reconciliation.local_missing.is_empty() {
            warn!(
                "File count in {} does not match the last sync, deleted files will be downloaded again",
                course.name
            );
            debug!(
                "In folder: {}, in cache: {}",
                local,
                cached.cloned().unwrap_or_default()
            );
            info!(
                "Folders of {} with fewer files than cached: {:?}",
                course.name, reconciliation.local_missing
            );
        }
    }
}

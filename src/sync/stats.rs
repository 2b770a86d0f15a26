use super::pipeline::{CourseState, RunReport};
use crate::utils::stats::duration_string;
use chrono::{DateTime, Local};
use indicatif::{HumanBytes, HumanCount, HumanDuration};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone)]
pub struct SyncStats {
    /// Wall clock time the run started.
    pub run_start_time: DateTime<Local>,
    pub run_duration: Duration,
    pub course_count: usize,
    pub course_synced_count: usize,
    pub course_partial_count: usize,
    pub course_skipped_count: usize,
    // categories whose file list was fetched again
    pub category_refetch_count: usize,
    pub file_listed_count: usize,
    pub file_synced_count: usize,
    pub file_stale_count: usize,
    pub file_missing_count: usize,
    pub download_count: usize,
    pub download_size: u64,
    pub failure_count: usize,
    pub download_folder_count: usize,
    pub cache_written_count: usize,
    pub cache_failed_count: usize,
}

impl SyncStats {
    pub fn from_report(report: &RunReport, run_start_time: DateTime<Local>) -> Self {
        let courses = &report.courses;
        Self {
            run_start_time,
            run_duration: report.timer.get_elapsed(),
            course_count: courses.len(),
            course_synced_count: report.count_in_state(CourseState::Success),
            course_partial_count: report.count_in_state(CourseState::PartialFailure),
            course_skipped_count: report.count_in_state(CourseState::Skipped),
            category_refetch_count: report.refetched_categories(),
            file_listed_count: courses.iter().map(|c| c.files_listed).sum(),
            file_synced_count: courses.iter().map(|c| c.synced).sum(),
            file_stale_count: courses.iter().map(|c| c.stale).sum(),
            file_missing_count: courses.iter().map(|c| c.missing).sum(),
            download_count: report.downloaded_count(),
            download_size: report.downloaded_size(),
            failure_count: courses.iter().map(|c| c.failures.len()).sum(),
            download_folder_count: report.downloaded_folders().len(),
            cache_written_count: report.commit.written.len(),
            cache_failed_count: report.commit.failed.len(),
        }
    }

    /// Bytes per second over the whole run.
    pub fn throughput(&self) -> u64 {
        let secs = self.run_duration.as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }
        (self.download_size as f64 / secs) as u64
    }

    pub fn print(&self) {
        let table = Table::new(self.to_print_items()).with(Style::psql()).to_string();
        println!("{}", table);
    }

    pub fn to_print_items(&self) -> Vec<SyncStatsPrintItem> {
        use SyncStatsValueType::*;
        vec![
            SyncStatsPrintItem::new("run_start_time", None, Time(self.run_start_time)),
            SyncStatsPrintItem::new("run_duration", None, Elapsed(self.run_duration)),
            SyncStatsPrintItem::new("course_count", None, Count(self.course_count)),
            SyncStatsPrintItem::new("course_synced_count", None, Count(self.course_synced_count)),
            SyncStatsPrintItem::new(
                "course_partial_count",
                Some("Courses With Failures"),
                Count(self.course_partial_count),
            ),
            SyncStatsPrintItem::new("course_skipped_count", None, Count(self.course_skipped_count)),
            SyncStatsPrintItem::new(
                "category_refetch_count",
                Some("Categories Refetched"),
                Count(self.category_refetch_count),
            ),
            SyncStatsPrintItem::new("file_listed_count", None, Count(self.file_listed_count)),
            SyncStatsPrintItem::new("file_synced_count", None, Count(self.file_synced_count)),
            SyncStatsPrintItem::new("file_stale_count", None, Count(self.file_stale_count)),
            SyncStatsPrintItem::new("file_missing_count", None, Count(self.file_missing_count)),
            SyncStatsPrintItem::new("download_count", None, Count(self.download_count)),
            SyncStatsPrintItem::new("download_size", None, FileSize(self.download_size)),
            SyncStatsPrintItem::new(
                "download_throughput",
                Some("Throughput (per second)"),
                FileSize(self.throughput()),
            ),
            SyncStatsPrintItem::new(
                "failure_count",
                Some("Failures"),
                Count(self.failure_count),
            ),
            SyncStatsPrintItem::new(
                "download_folder_count",
                Some("Folders Updated"),
                Count(self.download_folder_count),
            ),
            SyncStatsPrintItem::new("cache_written_count", None, Count(self.cache_written_count)),
            SyncStatsPrintItem::new("cache_failed_count", None, Count(self.cache_failed_count)),
        ]
    }

    /// Appends one row to `filename`, writing the header first when the file is new.
    pub fn write_csv(&self, filename: &Path) -> std::io::Result<()> {
        let file_exists = fs::metadata(filename).is_ok();
        let file = OpenOptions::new().append(true).create(true).open(filename)?;
        let mut wtr = csv::Writer::from_writer(file);

        let items = self.to_print_items();
        if !file_exists {
            wtr.write_record(items.iter().map(|item| &item.name))?;
        }
        wtr.write_record(items.iter().map(|item| &item.raw_string_value))?;

        wtr.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum SyncStatsValueType {
    Elapsed(Duration),
    Count(usize),
    FileSize(u64),
    Time(DateTime<Local>),
}

impl fmt::Display for SyncStatsValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyncStatsValueType::Elapsed(duration) => write!(f, "{}", HumanDuration(*duration)),
            SyncStatsValueType::Count(count) => write!(f, "{}", HumanCount(*count as u64)),
            SyncStatsValueType::FileSize(size) => write!(f, "{}", HumanBytes(*size)),
            SyncStatsValueType::Time(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl SyncStatsValueType {
    fn raw_string(&self) -> String {
        match self {
            SyncStatsValueType::Elapsed(duration) => duration_string(*duration),
            SyncStatsValueType::Count(count) => count.to_string(),
            SyncStatsValueType::FileSize(size) => size.to_string(),
            SyncStatsValueType::Time(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct SyncStatsPrintItem {
    #[tabled(skip)]
    pub name: String,
    #[tabled(rename = "Stat")]
    pub human_name: String,
    #[tabled(rename = "Value")]
    pub human_value: String,
    #[tabled(skip)]
    pub raw_string_value: String,
}

impl SyncStatsPrintItem {
    pub fn new(name: &str, human_name: Option<&str>, value: SyncStatsValueType) -> Self {
        let human_name = match human_name {
            Some(name) => name.to_string(),
            None => name
                .split('_')
                .filter(|s| *s != "count")
                .map(|s| {
                    let mut chars = s.chars();
                    match chars.next() {
                        None => String::new(),
                        Some(f) => f.to_uppercase().collect::<String>() + chars.as_str(),
                    }
                })
                .collect::<Vec<String>>()
                .join(" "),
        };

        Self {
            name: name.to_string(),
            human_name,
            human_value: value.to_string(),
            raw_string_value: value.raw_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> SyncStats {
        SyncStats {
            run_start_time: Local::now(),
            run_duration: Duration::from_secs(2),
            course_count: 3,
            course_synced_count: 1,
            course_partial_count: 1,
            course_skipped_count: 1,
            category_refetch_count: 4,
            file_listed_count: 10,
            file_synced_count: 6,
            file_stale_count: 1,
            file_missing_count: 3,
            download_count: 3,
            download_size: 4096,
            failure_count: 1,
            download_folder_count: 2,
            cache_written_count: 2,
            cache_failed_count: 0,
        }
    }

    #[test]
    fn human_name_is_derived_from_the_key() {
        let item = SyncStatsPrintItem::new("file_stale_count", None, SyncStatsValueType::Count(1));
        assert_eq!(item.human_name, "File Stale");
        assert_eq!(item.raw_string_value, "1");
    }

    #[test]
    fn throughput_divides_bytes_by_run_time() {
        assert_eq!(sample().throughput(), 2048);
    }

    #[test]
    fn csv_header_is_written_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let stats = sample();
        stats.write_csv(&path).unwrap();
        stats.write_csv(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("run_start_time,run_duration,course_count"));
        assert!(lines[1].contains("00:00:02.000"));
    }
}

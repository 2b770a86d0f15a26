use super::progress_bars::SyncStatusType::*;
use super::progress_bars::{SyncProgressBar, SyncStatusBars};
use super::types::*;
use console::{style, Term};
use indicatif::{HumanBytes, HumanCount, HumanDuration};
use std::sync::mpsc;

#[derive(Debug, Default, Clone, Copy)]
struct StatusCounters {
    course_total: usize,
    course_done: usize,
    course_skipped: usize,
    categories_to_fetch: usize,
    categories_fetched: usize,
    files_listed: usize,
    download_total: u64,
    download_done: u64,
    download_files: usize,
    download_failed: usize,
}

/// Renders status messages until every sender has been dropped.
pub fn handle_status(rx: mpsc::Receiver<StatusMessage>) {
    let (bars, _m) = SyncStatusBars::new_progress_bars();
    let term = Term::stdout();
    let mut counters = StatusCounters::default();

    for message in rx {
        match message {
            StatusMessage::RunStart(msg) => {
                let _ = term.hide_cursor();
                counters.course_total = msg.course_count;
                bars[Index].set_prefix("Checking courses:");
                bars[Index].enable_steady_tick_default();
            }
            StatusMessage::CourseIndexed(msg) => {
                counters.course_done += 1;
                counters.categories_to_fetch += msg.refetch_count;
                bars[Index].set_message(format!(
                    "{}/{} {}",
                    counters.course_done,
                    counters.course_total,
                    style(msg.course).bold()
                ));
                if counters.categories_to_fetch > counters.categories_fetched {
                    bars[FileList].set_prefix("Listing files:");
                    bars[FileList].enable_steady_tick_default();
                }
            }
            StatusMessage::CourseSkipped(msg) => {
                counters.course_done += 1;
                counters.course_skipped += 1;
                let _ = bars[Index].println(format!(
                    "{} {}: {}",
                    style("skipped").yellow(),
                    msg.course,
                    msg.reason
                ));
            }
            StatusMessage::FileListFetched(msg) => {
                counters.categories_fetched += 1;
                counters.files_listed += msg.file_count;
                bars[FileList].set_message(format!(
                    "{}/{} categories, {} files ({} > {})",
                    counters.categories_fetched,
                    counters.categories_to_fetch,
                    HumanCount(counters.files_listed as u64),
                    msg.course,
                    msg.category
                ));
            }
            StatusMessage::DownloadStart(msg) => {
                counters.download_total += msg.total_size;
                bars[Download].set_prefix("Downloading:");
                bars[Download].set_length(counters.download_total);
                bars[Download].set_message(msg.course);
            }
            StatusMessage::DownloadFile(msg) => {
                counters.download_files += 1;
                if msg.success {
                    counters.download_done += msg.file_size;
                    bars[Download].set_position(counters.download_done);
                } else {
                    counters.download_failed += 1;
                    let _ = bars[Download].println(format!(
                        "{} {}",
                        style("failed").red(),
                        msg.file_path.display()
                    ));
                }
            }
            StatusMessage::CommitStart => {
                bars[Index].finish_with_finish_style(format!(
                    "Checked {} courses ({} skipped) in {}",
                    style(HumanCount(counters.course_done as u64)).bold().green(),
                    counters.course_skipped,
                    HumanDuration(bars[Index].elapsed())
                ));
                bars[FileList].finish_with_finish_style(format!(
                    "Listed {} files in {} categories",
                    style(HumanCount(counters.files_listed as u64)).bold().green(),
                    counters.categories_fetched
                ));
                bars[Download].finish_with_finish_style(format!(
                    "Downloaded {} files, {} ({} failed)",
                    style(HumanCount((counters.download_files - counters.download_failed) as u64))
                        .bold()
                        .green(),
                    style(HumanBytes(counters.download_done)).bold().green(),
                    counters.download_failed
                ));
                bars[Commit].set_prefix("Updating cache...");
                bars[Commit].enable_steady_tick_default();
            }
            StatusMessage::CommitFinish(msg) => {
                bars[Commit].finish_with_finish_style(format!(
                    "Cache updated for {} courses ({} failed)",
                    msg.written, msg.failed
                ));
            }
            StatusMessage::RunFinish => {
                let _ = term.show_cursor();
            }
        }
    }
}

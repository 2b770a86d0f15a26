use std::borrow::Cow;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const STATUS_BAR_TYPE_COUNT: usize = 4;

#[derive(Debug, Copy, Clone)]
pub enum SyncStatusType {
    Index,
    FileList,
    Download,
    Commit,
}

impl SyncStatusType {
    fn to_index(self) -> usize {
        match self {
            SyncStatusType::Index => 0,
            SyncStatusType::FileList => 1,
            SyncStatusType::Download => 2,
            SyncStatusType::Commit => 3,
        }
    }
}

impl std::ops::Index<SyncStatusType> for [ProgressBar; STATUS_BAR_TYPE_COUNT] {
    type Output = ProgressBar;

    fn index(&self, task: SyncStatusType) -> &Self::Output {
        &self[task.to_index()]
    }
}

pub struct SyncStatusBars {}

const DEFAULT_SPINNER_TEMPLATE: &str =
    "[{elapsed_precise}] {spinner} {prefix:.bold.dim} {wide_msg}";
const DEFAULT_BAR_TEMPLATE: &str =
    "[{elapsed_precise}] {prefix:.bold}▕{bar:.blue}▏{bytes}/{total_bytes} {msg}";
const DEFAULT_FINISH_TEMPLATE: &str = "[{elapsed_precise}] {msg}";
const DEFAULT_STEADY_TICK_MS: u64 = 100;

impl SyncStatusBars {
    fn style(template: &str) -> ProgressStyle {
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
    }

    fn new_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            Self::style(DEFAULT_SPINNER_TEMPLATE)
                .tick_strings(&[".  ", ".. ", "...", " ..", "  .", "   "]),
        );
        pb
    }

    fn new_progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        pb.set_style(Self::style(DEFAULT_BAR_TEMPLATE).progress_chars("█▓▒░  "));
        pb
    }

    pub fn new_progress_bars() -> ([ProgressBar; STATUS_BAR_TYPE_COUNT], MultiProgress) {
        let m = MultiProgress::new();

        let bars: [ProgressBar; STATUS_BAR_TYPE_COUNT] = [
            m.add(SyncStatusBars::new_spinner()),      // SyncStatusType::Index => 0,
            m.add(SyncStatusBars::new_spinner()),      // SyncStatusType::FileList => 1,
            m.add(SyncStatusBars::new_progress_bar()), // SyncStatusType::Download => 2,
            m.add(SyncStatusBars::new_spinner()),      // SyncStatusType::Commit => 3,
        ];

        (bars, m)
    }

    pub fn new_finish_style() -> ProgressStyle {
        Self::style(DEFAULT_FINISH_TEMPLATE)
    }
}

pub trait SyncProgressBar {
    fn finish_with_finish_style(&self, message: impl Into<Cow<'static, str>>);
    fn enable_steady_tick_default(&self);
}

impl SyncProgressBar for ProgressBar {
    fn finish_with_finish_style(&self, message: impl Into<Cow<'static, str>>) {
        self.set_style(SyncStatusBars::new_finish_style());
        self.finish_with_message(message);
    }

    fn enable_steady_tick_default(&self) {
        self.enable_steady_tick(Duration::from_millis(DEFAULT_STEADY_TICK_MS));
    }
}

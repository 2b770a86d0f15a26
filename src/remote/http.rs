use super::Downloader;
use crate::error::{Result, SyncError};
use crate::model::DownloadTask;
use filetime::{set_file_mtime, FileTime};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::*;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, fails with a non-transient error or runs
    /// out of attempts. The delay doubles after every failed attempt.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    let delay = self.backoff * 2u32.pow(attempt - 1);
                    warn!(
                        "Attempt {}/{} for {} failed: {}, retrying in {:?}",
                        attempt, attempts, what, err, delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

pub struct HttpDownloader {
    client: Client,
    retry: RetryPolicy,
}

impl HttpDownloader {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, retry })
    }

    fn fetch_to(&self, link: &str, part_path: &Path) -> Result<u64> {
        let mut response = self.client.get(link).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                url: link.to_string(),
            });
        }

        let mut file = File::create(part_path)?;
        let written = io::copy(&mut response, &mut file)?;
        file.sync_all()?;
        Ok(written)
    }
}

/// Hidden sibling used while a transfer is in flight.
fn part_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.part", name))
}

impl Downloader for HttpDownloader {
    fn download_file(&self, task: &DownloadTask) -> Result<u64> {
        if let Some(parent) = task.destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let part = part_path(&task.destination);

        let written = self
            .retry
            .run(&task.link, || self.fetch_to(&task.link, &part))
            .map_err(|err| {
                let _ = fs::remove_file(&part);
                err
            })?;

        if task.expected_size > 0 && written != task.expected_size {
            debug!(
                "Size of '{}' is {} bytes, remote declared {}",
                task.destination.display(),
                written,
                task.expected_size
            );
        }

        fs::rename(&part, &task.destination)?;
        set_file_mtime(
            &task.destination,
            FileTime::from_system_time(SystemTime::from(task.modified)),
        )?;

        trace!("Downloaded {} ({} bytes)", task, written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn retries_transient_errors_until_success() {
        let calls = Cell::new(0);
        let result = quick().run("test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(SyncError::HttpStatus { status: 503, url: "u".into() })
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_last_attempt() {
        let calls = Cell::new(0);
        let result: Result<()> = quick().run("test", || {
            calls.set(calls.get() + 1);
            Err(SyncError::HttpStatus { status: 502, url: "u".into() })
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<()> = quick().run("test", || {
            calls.set(calls.get() + 1);
            Err(SyncError::HttpStatus { status: 404, url: "u".into() })
        });
        assert!(matches!(result, Err(SyncError::HttpStatus { status: 404, .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn interrupted_body_reads_are_retried() {
        let calls = Cell::new(0);
        let result = quick().run("test", || {
            calls.set(calls.get() + 1);
            match calls.get() {
                1 => Err(SyncError::Io(io::Error::new(io::ErrorKind::TimedOut, "body stalled"))),
                2 => Err(SyncError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "cut off"))),
                _ => Ok(42u64),
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn local_write_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<()> = quick().run("test", || {
            calls.set(calls.get() + 1);
            Err(SyncError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "read-only")))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn part_file_is_hidden() {
        assert_eq!(
            part_path(Path::new("/c/Slides/a.pdf")),
            PathBuf::from("/c/Slides/.a.pdf.part")
        );
    }
}

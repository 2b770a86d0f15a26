use crate::error::{Result, SyncError};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use tracing::*;

/// A single input that could not be processed, kept for diagnostics.
#[derive(Debug)]
pub struct ItemFailure {
    pub item: String,
    pub cause: SyncError,
}

/// Outcome of one fan-out: successful results in completion order plus the
/// failures that were isolated along the way.
#[derive(Debug)]
pub struct PoolReport<T> {
    pub results: Vec<T>,
    pub failures: Vec<ItemFailure>,
}

impl<T> PoolReport<T> {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fan-out executor with a fixed concurrency ceiling.
///
/// Every call to [`BoundedWorkPool::run`] blocks until all inputs have been
/// processed, so consecutive calls act as a barrier between pipeline stages.
pub struct BoundedWorkPool {
    name: &'static str,
    pool: ThreadPool,
}

impl BoundedWorkPool {
    pub fn new(name: &'static str, concurrency: usize) -> Result<Self> {
        let concurrency = concurrency.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(move |i| format!("{}-{}", name, i))
            .build()
            .map_err(|e| SyncError::Worker(e.to_string()))?;
        Ok(Self { name, pool })
    }

    pub fn run<I, T, F>(&self, inputs: Vec<I>, worker: F) -> PoolReport<T>
    where
        I: fmt::Display + Send + Sync,
        T: Send,
        F: Fn(&I) -> Result<T> + Send + Sync,
    {
        let failures: Mutex<Vec<ItemFailure>> = Mutex::new(Vec::new());

        let results: Vec<T> = self.pool.install(|| {
            inputs
                .par_iter()
                // one item per task so a slow item never holds back a batch
                .with_max_len(1)
                .filter_map(|input| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| worker(input)))
                        .unwrap_or_else(|payload| Err(SyncError::Worker(panic_message(payload))));
                    match outcome {
                        Ok(result) => Some(result),
                        Err(cause) => {
                            error!("[{}] Error processing {}: {}", self.name, input, cause);
                            failures
                                .lock()
                                .unwrap_or_else(|poisoned| poisoned.into_inner())
                                .push(ItemFailure {
                                    item: input.to_string(),
                                    cause,
                                });
                            None
                        }
                    }
                })
                .collect()
        });

        let failures = failures
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!(
            "[{}] {} items completed, {} failed",
            self.name,
            results.len(),
            failures.len()
        );

        PoolReport { results, failures }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn one_failure_does_not_cancel_siblings() {
        let pool = BoundedWorkPool::new("test", 8).unwrap();
        let inputs: Vec<usize> = (0..50).collect();

        let report = pool.run(inputs, |i| {
            if *i == 17 {
                Err(SyncError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "network error")))
            } else {
                Ok(*i * 2)
            }
        });

        assert_eq!(report.results.len(), 49);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, "17");
        assert!(!report.results.contains(&34));
    }

    #[test]
    fn panics_are_isolated() {
        let pool = BoundedWorkPool::new("test", 2).unwrap();
        let report = pool.run(vec![1, 2, 3], |i| {
            if *i == 2 {
                panic!("boom");
            }
            Ok(*i)
        });

        let mut results = report.results;
        results.sort();
        assert_eq!(results, vec![1, 3]);
        assert!(matches!(report.failures[0].cause, SyncError::Worker(ref m) if m == "boom"));
    }

    #[test]
    fn never_exceeds_concurrency() {
        let pool = BoundedWorkPool::new("test", 3).unwrap();
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let report = pool.run((0..24).collect::<Vec<u32>>(), |_| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(report.results.len(), 24);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn empty_input_returns_empty_report() {
        let pool = BoundedWorkPool::new("test", 4).unwrap();
        let report: PoolReport<u8> = pool.run(Vec::<u8>::new(), |_| Ok(1));
        assert!(report.results.is_empty());
        assert!(report.is_clean());
    }
}

//! Reconciliation and download pipeline.
//!
//! A run counts what the server has, what the last successful sync recorded
//! and what is on disk, refetches only the categories that disagree, and
//! writes the new cache records once every course is done.

pub mod catalog;
pub mod file_status;
pub mod inventory;
pub mod pipeline;
pub mod pool;
pub mod reconcile;
pub mod stats;
pub mod status;

pub use catalog::{courses_for_year, select_year};
pub use file_status::{plan_download, sync_status, SyncStatus};
pub use inventory::count_local_files;
pub use pipeline::{CourseReport, CourseState, RunReport, SyncEngine};
pub use pool::{BoundedWorkPool, ItemFailure, PoolReport};
pub use reconcile::{reconcile, Reconciliation};
pub use stats::SyncStats;

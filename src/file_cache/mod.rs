mod cache_store;

pub use cache_store::{CacheStore, CommitFailure, CommitReport, PendingWrite, CACHE_FILE_NAME};

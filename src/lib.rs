pub mod config;
pub mod counts;
pub mod error;
pub mod file_cache;
pub mod logging;
pub mod model;
pub mod remote;
pub mod sync;
pub mod utils;

pub use counts::CategoryCount;
pub use error::{Result, SyncError};

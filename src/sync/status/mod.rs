mod handler;
mod progress_bars;
mod types;

pub use handler::handle_status;
pub use types::*;

mod prompt;
pub mod stats;

pub use prompt::prompt_confirm;

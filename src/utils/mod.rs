//! Utility modules for obu

pub mod errors;
pub mod logger;

// Re-export commonly used items
pub use errors::{ObuError, Result};
pub use logger::{log_debug, log_error, log_info, log_warn};

//! User interface module - terminal output and message formatting.
//!
//! The bot runs unattended, so there are no prompts; everything here is
//! pure formatting in `formatter`.

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{display_error, display_report, display_status, display_success};

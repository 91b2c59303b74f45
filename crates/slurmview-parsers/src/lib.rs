//! Shared formatting utilities for scheduler output.
//!
//! Pure helpers used by the slurmview parsing layer to render durations,
//! timestamps, and memory sizes the way the dashboard displays them.

pub mod memory;
pub mod time;

pub use memory::{format_mb, parse_size_kb};
pub use time::{epoch_to_rfc3339, format_elapsed, format_time_limit};

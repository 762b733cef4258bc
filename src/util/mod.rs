//! Utility functions module
//!
//! Contains the stopwatch used to time writes and helpers for formatting
//! sizes, durations and speeds.

pub mod stopwatch;
pub mod units;

// Re-export commonly used items
pub use stopwatch::StopWatch;
pub use units::{calculate_throughput, format_bytes, format_millis, format_throughput, parse_bytes};

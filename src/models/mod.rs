//! Data models module
//!
//! Contains the serializable benchmark report.

pub mod report;

pub use report::BenchmarkReport;
pub(crate) use report::duration_serde;

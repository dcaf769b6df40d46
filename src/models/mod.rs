//! Data models for benchmark telemetry

pub mod config;
pub mod record;

// Re-export main model types
pub use config::Config;
pub use record::{Metric, RecordSchema, RecordSummary, TestRunRecord};

//! Transport Benchmark Telemetry
//!
//! Read-only access to stored benchmark runs of several transport protocol
//! implementations, and the latency histogram engine that turns a run's
//! round-trip-time samples into chartable distributions.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod histogram;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod output;
pub mod query;
pub mod registry;
pub mod repository;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use histogram::{build_histogram, build_raw_series, Bucket, Histogram, RawPoint};
pub use ingest::{HarnessImporter, ImportOutcome};
pub use models::{Config, Metric, RecordSummary, TestRunRecord};
pub use query::{QueryFacade, RecordDetail, VariantCount};
pub use registry::{VariantInfo, VariantRegistry};
pub use repository::TelemetryRepository;
pub use storage::{DocumentStore, JsonLinesStore, MemoryStore};
pub use types::{OutputFormat, ProtocolVariant};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values
pub mod defaults {
    use crate::types::OutputFormat;

    pub const DEFAULT_DATA_DIR: &str = "data";
    pub const DEFAULT_OUTPUT_FORMAT: OutputFormat = OutputFormat::Table;
    pub const DEFAULT_VARIANT: &str = "mrtp-redundancy";
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}

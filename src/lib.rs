//! Streaming multi-format import pipeline.
//!
//! An [`ImportRun`] pulls records from CSV, JSON, NDJSON, XML or spreadsheet
//! input, validates and transforms them, and yields fixed-size [`Batch`]es
//! with byte-based progress and per-record error collection.

pub mod cli;
pub mod config;
pub mod errors;
pub mod export;
pub mod import;
pub mod types;
pub mod utils;

pub use errors::{ConfigError, PipelineError};
pub use import::{
    ImportError, ImportFormat, ImportOptions, ImportProgress, ImportRun, ImportSource, ImportSummary, RunState,
    import, import_bytes, import_file, spawn_import,
};
pub use types::{Batch, RawRecord, RecordIndex};

/// Install logging from `INGESTLITE_LOG_*` environment variables.
///
/// # Errors
/// Fails when the log directory cannot be created or a logger is already set.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    utils::logger::configure_from_env()
}

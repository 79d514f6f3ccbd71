//! Per-record error accumulation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::options::ErrorCallback;
use crate::types::{RawRecord, RecordIndex};

/// A recoverable, per-record failure. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportError {
    pub record_index: RecordIndex,
    pub field: Option<String>,
    pub message: String,
    pub offending_record: Option<RawRecord>,
}

impl ImportError {
    pub fn new(record_index: RecordIndex, message: impl Into<String>) -> Self {
        Self { record_index, field: None, message: message.into(), offending_record: None }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_record(mut self, record: RawRecord) -> Self {
        self.offending_record = Some(record);
        self
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "record {} [{}]: {}", self.record_index, field, self.message),
            None => write!(f, "record {}: {}", self.record_index, self.message),
        }
    }
}

/// Ordered, append-only error list for one run.
///
/// Storage is copy-on-write so progress snapshots can hold the list without
/// ever observing later appends.
pub struct ErrorCollector {
    errors: Arc<Vec<ImportError>>,
    on_error: Option<ErrorCallback>,
}

impl ErrorCollector {
    pub fn new(on_error: Option<ErrorCallback>) -> Self {
        Self { errors: Arc::new(Vec::new()), on_error }
    }

    /// Append an error and notify the listener.
    pub fn record(&mut self, error: ImportError) {
        log::warn!("import: {error}");
        if let Some(cb) = &self.on_error {
            cb(&error);
        }
        Arc::make_mut(&mut self.errors).push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Immutable view of the errors recorded so far.
    pub fn snapshot(&self) -> Arc<Vec<ImportError>> {
        Arc::clone(&self.errors)
    }

    pub fn as_slice(&self) -> &[ImportError] {
        &self.errors
    }

    pub fn into_vec(self) -> Vec<ImportError> {
        Arc::try_unwrap(self.errors).unwrap_or_else(|shared| (*shared).clone())
    }
}

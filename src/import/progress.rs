//! Progress tracking driven by decoder chunk boundaries.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::collector::{ErrorCollector, ImportError};
use super::options::ProgressCallback;

/// Immutable progress snapshot handed to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub processed_bytes: u64,
    pub total_bytes: u64,
    pub processed_records: u64,
    pub percentage: f64,
    pub current_chunk_index: u64,
    pub total_chunks: u64,
    pub elapsed_ms: u64,
    pub errors: Arc<Vec<ImportError>>,
}

impl ImportProgress {
    pub fn is_complete(&self) -> bool {
        self.percentage >= 100.0
    }
}

pub struct ProgressTracker {
    chunk_size: u64,
    total_bytes: u64,
    processed_bytes: u64,
    processed_records: u64,
    current_chunk_index: u64,
    percentage: f64,
    started: Instant,
    on_progress: Option<ProgressCallback>,
}

impl ProgressTracker {
    /// `total_bytes` is the declared input size; zero when unknown.
    pub fn new(chunk_size: usize, total_bytes: u64, on_progress: Option<ProgressCallback>) -> Self {
        Self {
            chunk_size: (chunk_size as u64).max(1),
            total_bytes,
            processed_bytes: 0,
            processed_records: 0,
            current_chunk_index: 0,
            percentage: 0.0,
            started: Instant::now(),
            on_progress,
        }
    }

    pub fn total_chunks(&self) -> u64 {
        self.total_bytes.div_ceil(self.chunk_size)
    }

    /// Record decoder position. Returns `true` when one or more chunk
    /// boundaries were crossed, in which case listeners were notified.
    pub fn observe(&mut self, bytes_consumed: u64, records: u64, errors: &ErrorCollector) -> bool {
        self.processed_bytes = self.processed_bytes.max(bytes_consumed);
        self.processed_records = self.processed_records.max(records);
        let chunk = self.processed_bytes / self.chunk_size;
        if chunk <= self.current_chunk_index {
            return false;
        }
        self.current_chunk_index = chunk;
        if self.total_bytes > 0 {
            #[allow(clippy::cast_precision_loss)]
            let pct = self.processed_bytes as f64 / self.total_bytes as f64 * 100.0;
            self.percentage = self.percentage.max(pct.min(100.0));
        }
        self.publish(errors);
        true
    }

    /// Publish the terminal snapshot of a successful run (always 100%).
    pub fn complete(&mut self, records: u64, errors: &ErrorCollector) -> ImportProgress {
        self.processed_records = self.processed_records.max(records);
        if self.total_bytes == 0 {
            self.total_bytes = self.processed_bytes;
        }
        self.processed_bytes = self.processed_bytes.max(self.total_bytes);
        self.current_chunk_index = self.current_chunk_index.max(self.total_chunks());
        self.percentage = 100.0;
        self.publish(errors)
    }

    pub fn snapshot(&self, errors: &ErrorCollector) -> ImportProgress {
        ImportProgress {
            processed_bytes: self.processed_bytes,
            total_bytes: self.total_bytes,
            processed_records: self.processed_records,
            percentage: self.percentage,
            current_chunk_index: self.current_chunk_index,
            total_chunks: self.total_chunks(),
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            errors: errors.snapshot(),
        }
    }

    fn publish(&self, errors: &ErrorCollector) -> ImportProgress {
        let snap = self.snapshot(errors);
        log::debug!(
            "import progress: chunk {}/{} bytes={} records={} pct={:.1}",
            snap.current_chunk_index,
            snap.total_chunks,
            snap.processed_bytes,
            snap.processed_records,
            snap.percentage
        );
        if let Some(cb) = &self.on_progress {
            cb(snap.clone());
        }
        snap
    }
}

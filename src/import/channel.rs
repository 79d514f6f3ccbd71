//! Bridge from the blocking pull-based run to async consumers.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::options::ImportOptions;
use super::pipeline::{ImportSummary, import};
use super::source::ImportSource;
use crate::errors::PipelineError;
use crate::types::Batch;

/// A run executing on tokio's blocking pool.
pub struct ImportHandle {
    receiver: mpsc::Receiver<Result<Batch, PipelineError>>,
    worker: JoinHandle<ImportSummary>,
    cancellation: CancellationToken,
}

/// Run an import on the blocking pool, delivering batches through a bounded
/// channel of `capacity` (at least 1). The decoder pauses while the channel
/// is full. Dropping the handle's receiver cancels the run.
///
/// Must be called from within a tokio runtime.
pub fn spawn_import(source: impl Into<ImportSource>, options: ImportOptions, capacity: usize) -> ImportHandle {
    let (tx, receiver) = mpsc::channel(capacity.max(1));
    let cancellation = options.cancellation.clone();
    let token = cancellation.clone();
    let source = source.into();
    let worker = tokio::task::spawn_blocking(move || {
        let mut run = import(source, options);
        for item in run.by_ref() {
            if tx.blocking_send(item).is_err() {
                log::debug!("import {}: receiver dropped, cancelling", run.run_id());
                token.cancel();
                break;
            }
        }
        run.finish()
    });
    ImportHandle { receiver, worker, cancellation }
}

impl ImportHandle {
    pub async fn recv(&mut self) -> Option<Result<Batch, PipelineError>> {
        self.receiver.recv().await
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Wait for the worker and return its summary. Batches not yet received
    /// are dropped, which cancels a run that is still streaming.
    ///
    /// # Errors
    /// `Io` when the worker panicked or was aborted.
    pub async fn finish(self) -> Result<ImportSummary, PipelineError> {
        drop(self.receiver);
        self.worker.await.map_err(|e| PipelineError::Io(std::io::Error::other(e.to_string())))
    }
}

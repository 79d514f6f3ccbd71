//! The import run: a lazy, pull-based state machine over one input.

use std::io::BufRead;
use std::iter::FusedIterator;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::batch::BatchAccumulator;
use super::collector::{ErrorCollector, ImportError};
use super::decoder::{DecodeItem, RecordDecoder, open_decoder};
use super::detect::detect_format;
use super::hooks::{FieldError, VALIDATION_FAILED, Validation};
use super::options::{ImportFormat, ImportOptions};
use super::progress::{ImportProgress, ProgressTracker};
use super::source::ImportSource;
use crate::dev6;
use crate::errors::PipelineError;
use crate::types::{Batch, RawRecord, RecordIndex};
use crate::utils::logger::METRICS_TARGET;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Detecting,
    Streaming,
    Cancelled,
    Failed,
    Completed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Failed | Self::Completed)
    }
}

/// Final account of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub run_id: Uuid,
    pub format: ImportFormat,
    pub state: RunState,
    pub batches: usize,
    pub records_imported: u64,
    pub records_rejected: u64,
    pub errors: Vec<ImportError>,
    pub progress: Option<ImportProgress>,
    pub failure: Option<String>,
}

impl ImportSummary {
    pub fn is_success(&self) -> bool {
        self.state == RunState::Completed
    }

    /// One-line, user-facing result. Aborted runs never report as imported.
    pub fn outcome(&self) -> String {
        match self.state {
            RunState::Completed => {
                format!("{} records imported, {} errors", self.records_imported, self.records_rejected)
            }
            RunState::Failed => format!(
                "import aborted: {}",
                self.failure.as_deref().unwrap_or("unknown error")
            ),
            RunState::Cancelled => {
                format!("import cancelled after {} records", self.records_imported)
            }
            RunState::Idle | RunState::Detecting | RunState::Streaming => "import not finished".to_string(),
        }
    }
}

/// One import run. Nothing is read until the first call to `next()`.
///
/// Yields each full batch as soon as it is formed, then the trailing partial
/// batch. A fatal error is yielded once as `Err`; the iterator is exhausted
/// afterwards.
pub struct ImportRun {
    run_id: Uuid,
    state: RunState,
    source: Option<ImportSource>,
    options: ImportOptions,
    format: ImportFormat,
    decoder: Option<Box<dyn RecordDecoder>>,
    accumulator: BatchAccumulator,
    tracker: Option<ProgressTracker>,
    errors: ErrorCollector,
    last_index: RecordIndex,
    records_imported: u64,
    batches: usize,
    final_progress: Option<ImportProgress>,
    failure: Option<String>,
    started: Instant,
}

impl std::fmt::Debug for ImportRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportRun")
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .field("format", &self.format)
            .field("records", &self.last_index)
            .field("batches", &self.batches)
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

/// Start a lazy import run over `source`.
pub fn import(source: impl Into<ImportSource>, options: ImportOptions) -> ImportRun {
    ImportRun::new(source.into(), options)
}

pub fn import_file(path: impl AsRef<Path>, options: ImportOptions) -> ImportRun {
    ImportRun::new(ImportSource::path(path), options)
}

pub fn import_bytes(data: impl Into<Vec<u8>>, options: ImportOptions) -> ImportRun {
    ImportRun::new(ImportSource::bytes(data), options)
}

impl ImportRun {
    pub fn new(source: ImportSource, options: ImportOptions) -> Self {
        let errors = ErrorCollector::new(options.on_error.clone());
        Self {
            run_id: Uuid::new_v4(),
            state: RunState::Idle,
            source: Some(source),
            format: options.format,
            accumulator: BatchAccumulator::new(options.batch_size),
            options,
            decoder: None,
            tracker: None,
            errors,
            last_index: 0,
            records_imported: 0,
            batches: 0,
            final_progress: None,
            failure: None,
            started: Instant::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The resolved format; `Auto` until detection ran.
    pub fn format(&self) -> ImportFormat {
        self.format
    }

    pub fn errors(&self) -> &[ImportError] {
        self.errors.as_slice()
    }

    /// Latest progress snapshot, if the run got past detection.
    pub fn progress(&self) -> Option<ImportProgress> {
        self.final_progress
            .clone()
            .or_else(|| self.tracker.as_ref().map(|t| t.snapshot(&self.errors)))
    }

    /// Stop the run and summarize it. A run that has not reached a terminal
    /// state is cancelled; its pending partial batch is dropped.
    pub fn finish(mut self) -> ImportSummary {
        if !self.state.is_terminal() {
            self.cancel();
        }
        let progress = self.progress();
        ImportSummary {
            run_id: self.run_id,
            format: self.format,
            state: self.state,
            batches: self.batches,
            records_imported: self.records_imported,
            records_rejected: self.errors.len() as u64,
            progress,
            failure: self.failure,
            errors: self.errors.into_vec(),
        }
    }

    fn transition(&mut self, to: RunState) {
        dev6!(self.run_id, self.state => to);
        self.state = to;
    }

    fn start(&mut self) -> Result<(), PipelineError> {
        self.transition(RunState::Detecting);
        self.options.validate()?;
        let Some(source) = self.source.take() else {
            return Err(PipelineError::InvalidOptions("import source already consumed".into()));
        };
        let mut opened = source.open(self.options.chunk_size)?;
        let limit = self.options.max_input_bytes;
        if let Some(size) = opened.size
            && size > limit
        {
            return Err(PipelineError::SizeLimitExceeded { size, limit });
        }

        let explicit = self.options.format != ImportFormat::Auto;
        let format = if explicit {
            Some(self.options.format)
        } else {
            detect_format(&mut opened.reader, opened.name.as_deref(), opened.content_type.as_deref())?
        };
        let total = opened.size.unwrap_or(0);
        let tracker = ProgressTracker::new(self.options.chunk_size, total, self.options.on_progress.clone());

        let Some(format) = format else {
            if opened.reader.fill_buf()?.is_empty() {
                log::info!("import {}: empty input", self.run_id);
                self.tracker = Some(tracker);
                self.transition(RunState::Streaming);
                return Ok(());
            }
            let what = opened.name.unwrap_or_else(|| "input".to_string());
            return Err(PipelineError::UnsupportedFormat(format!("cannot detect the format of {what}")));
        };
        self.format = format;
        log::info!(
            "import {}: format={} size={} chunk_size={} batch_size={}",
            self.run_id,
            format,
            opened.size.map_or_else(|| "unknown".to_string(), |s| s.to_string()),
            self.options.chunk_size,
            self.options.batch_size
        );
        let decoder = open_decoder(format, opened, &self.options, !explicit)?;
        self.format = decoder.format();
        self.decoder = Some(decoder);
        self.tracker = Some(tracker);
        self.transition(RunState::Streaming);
        Ok(())
    }

    /// Drive the decoder until a batch is ready or the run ends.
    fn pump(&mut self) -> Result<Option<Batch>, PipelineError> {
        loop {
            if self.options.cancellation.is_cancelled() {
                self.cancel();
                return Ok(None);
            }
            let Some(decoder) = self.decoder.as_mut() else {
                return Ok(self.complete());
            };
            let item = decoder.next_item()?;
            let consumed = decoder.bytes_consumed();
            let limit = self.options.max_input_bytes;
            if consumed > limit {
                return Err(PipelineError::SizeLimitExceeded { size: consumed, limit });
            }
            let Some(item) = item else {
                return Ok(self.complete());
            };
            self.last_index += 1;
            let ready = self.process(self.last_index, item)?;

            if self.options.cancellation.is_cancelled() {
                self.cancel();
                return Ok(None);
            }
            if let Some(tracker) = self.tracker.as_mut() {
                tracker.observe(consumed, self.last_index, &self.errors);
            }
            if let Some(batch) = ready {
                self.batches += 1;
                log::debug!(
                    "import {}: batch {} ({} records from #{})",
                    self.run_id,
                    batch.index,
                    batch.len(),
                    batch.first_record_index
                );
                return Ok(Some(batch));
            }
        }
    }

    fn process(&mut self, index: RecordIndex, item: DecodeItem) -> Result<Option<Batch>, PipelineError> {
        let record = match item {
            DecodeItem::Record(r) => r,
            DecodeItem::Malformed { message, raw } => {
                let mut err = ImportError::new(index, message);
                if let Some(raw) = raw {
                    err = err.with_record(raw);
                }
                self.errors.record(err);
                return Ok(None);
            }
        };
        if let Some(validator) = &self.options.validator
            && let Validation::Invalid(problems) = validator.validate(&record)
        {
            self.errors.record(rejection(index, &problems, record));
            return Ok(None);
        }
        let record = match &self.options.transformer {
            Some(t) => t
                .transform(record)
                .map_err(|message| PipelineError::Transform { record_index: index, message })?,
            None => record,
        };
        self.records_imported += 1;
        Ok(self.accumulator.push(index, record))
    }

    fn complete(&mut self) -> Option<Batch> {
        self.decoder = None;
        let last = self.accumulator.flush();
        if last.is_some() {
            self.batches += 1;
        }
        if let Some(tracker) = self.tracker.as_mut() {
            self.final_progress = Some(tracker.complete(self.last_index, &self.errors));
        }
        log::info!(
            target: METRICS_TARGET,
            "import {} completed: format={} records={} imported={} rejected={} batches={} elapsed_ms={}",
            self.run_id,
            self.format,
            self.last_index,
            self.records_imported,
            self.errors.len(),
            self.batches,
            self.started.elapsed().as_millis()
        );
        self.transition(RunState::Completed);
        last
    }

    fn cancel(&mut self) {
        self.decoder = None;
        let dropped = self.accumulator.discard();
        log::info!("import {}: cancelled after {} records ({dropped} pending dropped)", self.run_id, self.last_index);
        self.transition(RunState::Cancelled);
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        self.decoder = None;
        self.accumulator.discard();
        log::error!("import {}: {err}", self.run_id);
        self.failure = Some(err.to_string());
        self.transition(RunState::Failed);
        err
    }
}

fn rejection(index: RecordIndex, problems: &[FieldError], record: RawRecord) -> ImportError {
    let message = if problems.is_empty() {
        VALIDATION_FAILED.to_string()
    } else {
        problems.iter().map(|p| p.message.as_str()).collect::<Vec<_>>().join("; ")
    };
    let mut err = ImportError::new(index, message).with_record(record);
    if let Some(field) = problems.first().and_then(|p| p.field.clone()) {
        err = err.with_field(field);
    }
    err
}

impl Iterator for ImportRun {
    type Item = Result<Batch, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == RunState::Idle
            && let Err(e) = self.start()
        {
            return Some(Err(self.fail(e)));
        }
        if self.state != RunState::Streaming {
            return None;
        }
        match self.pump() {
            Ok(batch) => batch.map(Ok),
            Err(e) => Some(Err(self.fail(e))),
        }
    }
}

impl FusedIterator for ImportRun {}

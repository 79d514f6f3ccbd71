use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::collector::ImportError;
use super::hooks::{FnTransformer, PredicateValidator, RecordTransformer, RecordValidator};
use super::progress::ImportProgress;
use crate::errors::PipelineError;
use crate::types::RawRecord;

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    #[default]
    Auto,
    Csv,
    Json,
    Ndjson,
    Xml,
    Spreadsheet,
}

impl ImportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Xml => "xml",
            Self::Spreadsheet => "spreadsheet",
        }
    }
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "csv" | "tsv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            "xml" => Ok(Self::Xml),
            "spreadsheet" | "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" | "excel" => {
                Ok(Self::Spreadsheet)
            }
            other => Err(PipelineError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// `None` means `,`, or the sniffed delimiter when the format is detected.
    pub delimiter: Option<u8>,
    pub has_headers: bool,
    pub type_infer: bool,
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: None, has_headers: true, type_infer: true, trim: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JsonOptions {
    /// Dot-separated path to the record array, e.g. `payload.items`.
    /// Overrides the conventional-key heuristic.
    pub record_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct XmlOptions {
    /// Slash-separated element path from the root to the record element,
    /// e.g. `catalog/items/item`.
    pub record_path: Option<String>,
    pub type_infer: bool,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self { record_path: None, type_infer: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpreadsheetOptions {
    /// Sheet to read; the first sheet when unset.
    pub sheet: Option<String>,
}

pub type ProgressCallback = Arc<dyn Fn(ImportProgress) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&ImportError) + Send + Sync>;

#[derive(Clone)]
pub struct ImportOptions {
    pub format: ImportFormat,
    pub chunk_size: usize,
    pub batch_size: usize,
    pub max_input_bytes: u64,
    pub csv: CsvOptions,
    pub json: JsonOptions,
    pub xml: XmlOptions,
    pub spreadsheet: SpreadsheetOptions,
    pub validator: Option<Arc<dyn RecordValidator>>,
    pub transformer: Option<Arc<dyn RecordTransformer>>,
    pub on_progress: Option<ProgressCallback>,
    pub on_error: Option<ErrorCallback>,
    pub cancellation: CancellationToken,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            format: ImportFormat::Auto,
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            csv: CsvOptions::default(),
            json: JsonOptions::default(),
            xml: XmlOptions::default(),
            spreadsheet: SpreadsheetOptions::default(),
            validator: None,
            transformer: None,
            on_progress: None,
            on_error: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("format", &self.format)
            .field("chunk_size", &self.chunk_size)
            .field("batch_size", &self.batch_size)
            .field("max_input_bytes", &self.max_input_bytes)
            .field("csv", &self.csv)
            .field("json", &self.json)
            .field("xml", &self.xml)
            .field("spreadsheet", &self.spreadsheet)
            .field("validator", &self.validator.is_some())
            .field("transformer", &self.transformer.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

impl ImportOptions {
    pub fn with_format(mut self, format: ImportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_input_bytes(mut self, limit: u64) -> Self {
        self.max_input_bytes = limit;
        self
    }

    pub fn with_validator(mut self, validator: impl RecordValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Use a plain predicate as the validator; rejected records are reported
    /// with the message `"Validation failed"`.
    pub fn validate_with<F>(self, predicate: F) -> Self
    where
        F: Fn(&RawRecord) -> bool + Send + Sync + 'static,
    {
        self.with_validator(PredicateValidator::new(predicate))
    }

    pub fn with_transformer(mut self, transformer: impl RecordTransformer + 'static) -> Self {
        self.transformer = Some(Arc::new(transformer));
        self
    }

    pub fn transform_with<F>(self, f: F) -> Self
    where
        F: Fn(RawRecord) -> Result<RawRecord, String> + Send + Sync + 'static,
    {
        self.with_transformer(FnTransformer::new(f))
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(ImportProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ImportError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// # Errors
    /// Returns `InvalidOptions` when `chunk_size` or `batch_size` is zero.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.chunk_size == 0 {
            return Err(PipelineError::InvalidOptions("chunk_size must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidOptions("batch_size must be > 0".into()));
        }
        Ok(())
    }
}

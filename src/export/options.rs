use std::path::Path;
use std::str::FromStr;

use crate::errors::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Ndjson,
    Csv,
    Json,
}

impl ExportFormat {
    /// Guess the output format from a destination file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "tsv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "ndjson" | "jsonl" => Some(Self::Ndjson),
            _ => None,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            other => Err(PipelineError::UnsupportedFormat(format!("cannot export as {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub write_headers: bool,
}
impl Default for CsvOptions {
    fn default() -> Self { Self { delimiter: b',', write_headers: true } }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub csv: CsvOptions,
    pub redact_fields: Option<Vec<String>>, // top-level fields to mask
    pub limit: Option<usize>,
}
impl Default for ExportOptions {
    fn default() -> Self {
        Self { format: ExportFormat::Ndjson, csv: CsvOptions::default(), redact_fields: None, limit: None }
    }
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: u64,
}

use std::path::Path;

use crate::errors::PipelineError;
use crate::export::ExportFormat;

pub fn parse_format_input(s: Option<&str>) -> Option<String> {
    s.map(|x| x.trim().to_lowercase()).filter(|x| !x.is_empty())
}

/// Explicit `--to`, else the output extension, else NDJSON.
///
/// # Errors
/// `UnsupportedFormat` for an unknown explicit format.
pub fn resolve_export_format(to: Option<&str>, output: &Path) -> Result<ExportFormat, PipelineError> {
    match parse_format_input(to) {
        Some(f) => f.parse(),
        None => Ok(ExportFormat::from_path(output).unwrap_or(ExportFormat::Ndjson)),
    }
}

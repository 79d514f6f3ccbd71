use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;
use tempfile::NamedTempFile;

use super::options::{ExportFormat, ExportOptions, ExportReport};
use super::sinks::{CsvSink, DocSink, JsonArraySink, NdjsonSink};
use crate::types::RawRecord;

/// Export records to a file atomically via a temp file + persist.
///
/// # Errors
/// Returns an error if the destination cannot be created or the write/persist fails.
pub fn export_file<I>(records: I, path: impl AsRef<Path>, opts: &ExportOptions) -> io::Result<ExportReport>
where
    I: IntoIterator<Item = RawRecord>,
{
    log::info!("export: path={}, format={:?}", path.as_ref().display(), opts.format);
    let dest = path.as_ref();
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        std::fs::create_dir_all(parent)?;
    }
    // Temp file in the destination directory so persist is a rename.
    let mut tmp = NamedTempFile::new_in(parent)?;
    let report = export_to_writer(records, &mut tmp, opts)?;
    let mut last_err: Option<io::Error> = None;
    for attempt in 0..5 {
        if dest.exists()
            && let Err(e) = std::fs::remove_file(dest)
        {
            last_err = Some(e);
            std::thread::sleep(std::time::Duration::from_millis(10 + attempt * 5));
            continue;
        }
        match tmp.persist(dest) {
            Ok(_file) => return Ok(report),
            Err(pe) => {
                last_err = Some(pe.error);
                tmp = pe.file;
                std::thread::sleep(std::time::Duration::from_millis(10 + attempt * 5));
            }
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("failed to persist export file")))
}

/// Export a record stream into a freshly created file, without the temp file.
///
/// # Errors
/// Returns an error if the file cannot be created or writing fails.
pub fn export_to_path<I>(records: I, path: impl AsRef<Path>, opts: &ExportOptions) -> io::Result<ExportReport>
where
    I: IntoIterator<Item = RawRecord>,
{
    let file = File::create(path)?;
    export_to_writer(records, file, opts)
}

/// # Errors
/// Returns serialization or write errors from the sink.
pub fn export_to_writer<I, W>(records: I, writer: W, opts: &ExportOptions) -> io::Result<ExportReport>
where
    I: IntoIterator<Item = RawRecord>,
    W: Write,
{
    let mut report = ExportReport::default();
    let redact = opts.redact_fields.as_ref();
    let mut sink: Box<dyn DocSink + '_> = match opts.format {
        ExportFormat::Ndjson => Box::new(NdjsonSink::new(writer)),
        ExportFormat::Csv => Box::new(CsvSink::new(writer, opts.csv.delimiter, opts.csv.write_headers)),
        ExportFormat::Json => Box::new(JsonArraySink::new(writer)),
    };
    let limit = opts.limit.unwrap_or(usize::MAX);
    for mut doc in records.into_iter().take(limit) {
        if let Some(fields) = redact {
            apply_redaction(&mut doc, fields);
        }
        sink.write_doc(&doc)?;
        report.written += 1;
    }
    sink.finish()?;
    Ok(report)
}

fn apply_redaction(doc: &mut Value, fields: &[String]) {
    if let Value::Object(map) = doc {
        for f in fields {
            if let Some(v) = map.get_mut(f) {
                *v = Value::String("***REDACTED***".into());
            }
        }
    }
}

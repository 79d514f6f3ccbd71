use std::io::{BufRead, Cursor};

use super::csv::CsvDecoder;
use super::detect::{looks_line_delimited, sniff_delimiter};
use super::json::JsonDecoder;
use super::ndjson::NdjsonDecoder;
use super::options::{ImportFormat, ImportOptions};
use super::source::{OpenedSource, read_bounded};
use super::spreadsheet::SpreadsheetDecoder;
use super::xml::XmlDecoder;
use crate::errors::PipelineError;
use crate::types::RawRecord;

/// One step of decoder output. Both variants consume a record index.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeItem {
    Record(RawRecord),
    /// A recoverable, record-scoped decode failure (e.g. wrong column count).
    Malformed { message: String, raw: Option<RawRecord> },
}

/// Lazily turns an input into records.
pub trait RecordDecoder: Send {
    /// `Ok(None)` signals end of input; `Err` is fatal for the run.
    fn next_item(&mut self) -> Result<Option<DecodeItem>, PipelineError>;

    /// Bytes of input consumed so far.
    fn bytes_consumed(&self) -> u64;

    fn format(&self) -> ImportFormat;
}

/// Build the decoder for a resolved format. `format` must not be `Auto`.
/// `detected` marks a format that was guessed rather than requested; such
/// input gets its CSV delimiter sniffed, and "JSON" holding one object per
/// line is decoded as NDJSON.
pub(crate) fn open_decoder(
    format: ImportFormat,
    mut source: OpenedSource,
    opts: &ImportOptions,
    detected: bool,
) -> Result<Box<dyn RecordDecoder>, PipelineError> {
    super::source::skip_bom(&mut source.reader)?;
    let total = source.size.unwrap_or(0);
    let decoder: Box<dyn RecordDecoder> = match format {
        ImportFormat::Csv => {
            let mut csv_opts = opts.csv.clone();
            if detected && csv_opts.delimiter.is_none() {
                let head = source.reader.fill_buf()?;
                csv_opts.delimiter = sniff_delimiter(&head[..head.len().min(4096)]);
            }
            Box::new(CsvDecoder::new(source.reader, &csv_opts))
        }
        ImportFormat::Ndjson => Box::new(NdjsonDecoder::new(source.reader)),
        ImportFormat::Json => {
            let buf = read_bounded(source.reader, opts.max_input_bytes)?;
            if detected && looks_line_delimited(&buf) {
                log::debug!("input holds one JSON value per line, decoding as ndjson");
                Box::new(NdjsonDecoder::new(Cursor::new(buf)))
            } else {
                let total = if total > 0 { total } else { buf.len() as u64 };
                Box::new(JsonDecoder::from_slice(&buf, &opts.json, total)?)
            }
        }
        ImportFormat::Xml => Box::new(XmlDecoder::new(source.reader, &opts.xml)),
        ImportFormat::Spreadsheet => Box::new(SpreadsheetDecoder::from_reader(
            source.reader,
            &opts.spreadsheet,
            opts.max_input_bytes,
        )?),
        ImportFormat::Auto => {
            return Err(PipelineError::UnsupportedFormat("format was not resolved".into()));
        }
    };
    Ok(decoder)
}

/// Collect every record of an input, ignoring malformed items. Intended for
/// tests and small inputs.
///
/// # Errors
/// Propagates fatal decode errors.
pub fn decode_all(decoder: &mut dyn RecordDecoder) -> Result<Vec<RawRecord>, PipelineError> {
    let mut out = Vec::new();
    while let Some(item) = decoder.next_item()? {
        if let DecodeItem::Record(r) = item {
            out.push(r);
        }
    }
    Ok(out)
}

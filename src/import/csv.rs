use std::io::Read;

use serde_json::{Map, Value};

use super::decoder::{DecodeItem, RecordDecoder};
use super::options::{CsvOptions, ImportFormat};
use super::util::field_to_value;
use crate::errors::PipelineError;

/// Streaming CSV decoder; one record per row after the optional header.
pub struct CsvDecoder<R: Read> {
    rdr: csv::Reader<R>,
    headers: Option<Vec<String>>,
    header_read: bool,
    type_infer: bool,
    row: csv::StringRecord,
}

impl<R: Read> CsvDecoder<R> {
    pub fn new(reader: R, opts: &CsvOptions) -> Self {
        let rdr = csv::ReaderBuilder::new()
            .has_headers(opts.has_headers)
            .delimiter(opts.delimiter.unwrap_or(b','))
            .flexible(true)
            .trim(if opts.trim { csv::Trim::All } else { csv::Trim::None })
            .from_reader(reader);
        Self {
            rdr,
            headers: None,
            header_read: !opts.has_headers,
            type_infer: opts.type_infer,
            row: csv::StringRecord::new(),
        }
    }

    fn read_headers(&mut self) -> Result<(), PipelineError> {
        if self.header_read {
            return Ok(());
        }
        self.header_read = true;
        let hdrs = self.rdr.headers().map_err(|e| csv_fatal(&e))?;
        if !hdrs.is_empty() {
            self.headers = Some(hdrs.iter().map(std::string::ToString::to_string).collect());
        }
        Ok(())
    }

    fn row_to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (i, field) in self.row.iter().enumerate() {
            let key = self
                .headers
                .as_ref()
                .and_then(|h| h.get(i))
                .cloned()
                .unwrap_or_else(|| format!("field_{i}"));
            map.insert(key, field_to_value(field, self.type_infer));
        }
        map
    }
}

impl<R: Read + Send> RecordDecoder for CsvDecoder<R> {
    fn next_item(&mut self) -> Result<Option<DecodeItem>, PipelineError> {
        self.read_headers()?;
        loop {
            match self.rdr.read_record(&mut self.row) {
                Ok(false) => return Ok(None),
                Ok(true) => {}
                Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                    return Ok(Some(DecodeItem::Malformed { message: e.to_string(), raw: None }));
                }
                Err(e) => return Err(csv_fatal(&e)),
            }
            if self.row.iter().all(str::is_empty) {
                continue;
            }
            let map = self.row_to_map();
            if let Some(h) = &self.headers
                && h.len() != self.row.len()
            {
                let message = format!("expected {} fields, found {}", h.len(), self.row.len());
                return Ok(Some(DecodeItem::Malformed { message, raw: Some(Value::Object(map)) }));
            }
            return Ok(Some(DecodeItem::Record(Value::Object(map))));
        }
    }

    fn bytes_consumed(&self) -> u64 {
        self.rdr.position().byte()
    }

    fn format(&self) -> ImportFormat {
        ImportFormat::Csv
    }
}

fn csv_fatal(e: &csv::Error) -> PipelineError {
    PipelineError::decode(ImportFormat::Csv, e.to_string())
}

use std::io::BufRead;

use super::decoder::{DecodeItem, RecordDecoder};
use super::options::ImportFormat;
use crate::errors::PipelineError;

/// Line-delimited JSON; one record per non-blank line.
pub struct NdjsonDecoder<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    consumed: u64,
}

impl<R: BufRead> NdjsonDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: Vec::with_capacity(8 * 1024), consumed: 0 }
    }
}

impl<R: BufRead + Send> RecordDecoder for NdjsonDecoder<R> {
    fn next_item(&mut self) -> Result<Option<DecodeItem>, PipelineError> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .map_err(|e| PipelineError::decode(ImportFormat::Ndjson, e.to_string()))?;
            if n == 0 {
                return Ok(None);
            }
            self.consumed += n as u64;
            let line = self.buf.trim_ascii();
            if line.is_empty() {
                continue;
            }
            // Bad UTF-8 and bad JSON only cost this line.
            return Ok(Some(match serde_json::from_slice::<serde_json::Value>(line) {
                Ok(v) => DecodeItem::Record(v),
                Err(e) => DecodeItem::Malformed {
                    message: e.to_string(),
                    raw: Some(serde_json::Value::String(String::from_utf8_lossy(line).into_owned())),
                },
            }));
        }
    }

    fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    fn format(&self) -> ImportFormat {
        ImportFormat::Ndjson
    }
}

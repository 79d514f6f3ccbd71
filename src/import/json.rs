use serde_json::Value;

use super::decoder::{DecodeItem, RecordDecoder};
use super::options::{ImportFormat, JsonOptions};
use super::util::unwrap_records;
use crate::errors::PipelineError;

/// Whole-document JSON decoder.
///
/// JSON cannot be split into records without a streaming codec, so the
/// document is parsed in full after the size ceiling has been enforced.
/// Byte progress is reported proportionally to the element position.
pub struct JsonDecoder {
    records: std::vec::IntoIter<Value>,
    total_records: u64,
    yielded: u64,
    total_bytes: u64,
}

impl JsonDecoder {
    /// # Errors
    /// `Decode` for malformed JSON or an unresolvable record path.
    pub fn from_slice(buf: &[u8], opts: &JsonOptions, total_bytes: u64) -> Result<Self, PipelineError> {
        let records = if buf.iter().all(u8::is_ascii_whitespace) {
            Vec::new()
        } else {
            let doc: Value = serde_json::from_slice(buf)
                .map_err(|e| PipelineError::decode(ImportFormat::Json, e.to_string()))?;
            unwrap_records(doc, opts.record_path.as_deref())
                .map_err(|m| PipelineError::decode(ImportFormat::Json, m))?
        };
        Ok(Self {
            total_records: records.len() as u64,
            records: records.into_iter(),
            yielded: 0,
            total_bytes,
        })
    }
}

impl RecordDecoder for JsonDecoder {
    fn next_item(&mut self) -> Result<Option<DecodeItem>, PipelineError> {
        let next = self.records.next();
        if next.is_some() {
            self.yielded += 1;
        }
        Ok(next.map(DecodeItem::Record))
    }

    fn bytes_consumed(&self) -> u64 {
        if self.total_records == 0 || self.yielded >= self.total_records {
            return self.total_bytes;
        }
        #[allow(clippy::cast_possible_truncation)]
        let share = (u128::from(self.total_bytes) * u128::from(self.yielded)
            / u128::from(self.total_records)) as u64;
        share
    }

    fn format(&self) -> ImportFormat {
        ImportFormat::Json
    }
}

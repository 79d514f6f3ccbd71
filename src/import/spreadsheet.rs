use std::io::{Cursor, Read};

use calamine::{Data, DataType, Range, Reader, open_workbook_auto_from_rs};
use serde_json::{Map, Number, Value};

use super::decoder::{DecodeItem, RecordDecoder};
use super::options::{ImportFormat, SpreadsheetOptions};
use super::source::read_bounded;
use crate::errors::PipelineError;

/// Decodes one worksheet of an xlsx/xls/xlsb/ods workbook. The first row
/// names the columns. Workbooks are random-access containers, so the file is
/// read in full (bounded by the size ceiling) and rows are yielded lazily.
pub struct SpreadsheetDecoder {
    range: Range<Data>,
    headers: Vec<String>,
    next_row: usize,
    height: usize,
    total_bytes: u64,
}

impl SpreadsheetDecoder {
    /// # Errors
    /// `SizeLimitExceeded` past `limit` bytes, `Decode` for unreadable
    /// workbooks or a missing sheet.
    pub fn from_reader<R: Read>(
        reader: R,
        opts: &SpreadsheetOptions,
        limit: u64,
    ) -> Result<Self, PipelineError> {
        let buf = read_bounded(reader, limit)?;
        Self::from_bytes(buf, opts)
    }

    /// # Errors
    /// `Decode` for unreadable workbooks or a missing sheet.
    pub fn from_bytes(buf: Vec<u8>, opts: &SpreadsheetOptions) -> Result<Self, PipelineError> {
        if buf.is_empty() {
            return Ok(Self::from_range(Range::empty(), 0));
        }
        let total_bytes = buf.len() as u64;
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(buf)).map_err(sheet_err)?;
        let names = workbook.sheet_names();
        let sheet = match &opts.sheet {
            Some(wanted) => {
                if !names.iter().any(|n| n == wanted) {
                    return Err(sheet_err(format!("sheet '{wanted}' not found")));
                }
                Some(wanted.clone())
            }
            None => names.first().cloned(),
        };
        let range = match sheet {
            Some(name) => {
                log::debug!("reading worksheet '{name}'");
                workbook.worksheet_range(&name).map_err(sheet_err)?
            }
            None => Range::empty(),
        };
        Ok(Self::from_range(range, total_bytes))
    }

    pub(crate) fn from_range(range: Range<Data>, total_bytes: u64) -> Self {
        let (height, width) = range.get_size();
        let headers = (0..width)
            .map(|c| match range.get((0, c)) {
                Some(cell) if !cell.is_empty() => cell_text(cell),
                _ => format!("field_{c}"),
            })
            .collect();
        Self { range, headers, next_row: 1.min(height), height, total_bytes }
    }

    fn row(&self, r: usize) -> Option<DecodeItem> {
        let mut map = Map::new();
        let mut problems = Vec::new();
        let mut blank = true;
        for (c, name) in self.headers.iter().enumerate() {
            let cell = self.range.get((r, c)).unwrap_or(&Data::Empty);
            if !cell.is_empty() {
                blank = false;
            }
            match cell_to_value(cell) {
                Ok(v) => {
                    map.insert(name.clone(), v);
                }
                Err(msg) => {
                    problems.push(format!("column {name}: {msg}"));
                    map.insert(name.clone(), Value::Null);
                }
            }
        }
        if blank {
            return None;
        }
        Some(if problems.is_empty() {
            DecodeItem::Record(Value::Object(map))
        } else {
            DecodeItem::Malformed { message: problems.join("; "), raw: Some(Value::Object(map)) }
        })
    }
}

impl RecordDecoder for SpreadsheetDecoder {
    fn next_item(&mut self) -> Result<Option<DecodeItem>, PipelineError> {
        while self.next_row < self.height {
            let r = self.next_row;
            self.next_row += 1;
            if let Some(item) = self.row(r) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    fn bytes_consumed(&self) -> u64 {
        if self.height <= 1 || self.next_row >= self.height {
            return self.total_bytes;
        }
        #[allow(clippy::cast_possible_truncation)]
        let share = (u128::from(self.total_bytes) * self.next_row as u128 / self.height as u128) as u64;
        share
    }

    fn format(&self) -> ImportFormat {
        ImportFormat::Spreadsheet
    }
}

fn sheet_err(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::decode(ImportFormat::Spreadsheet, e.to_string())
}

fn cell_text(cell: &Data) -> String {
    match cell_to_value(cell) {
        Ok(Value::String(s)) => s,
        _ => cell.to_string(),
    }
}

/// Typed cell to JSON. Error cells are reported as `Err`.
pub(crate) fn cell_to_value(cell: &Data) -> Result<Value, String> {
    Ok(match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Value::from(*f as i64)
            } else {
                Number::from_f64(*f).map_or(Value::Null, Value::Number)
            }
        }
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => {
                Value::String(dt.date().format("%Y-%m-%d").to_string())
            }
            Some(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => Value::String(cell.to_string()),
        },
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => return Err(format!("cell error {e}")),
    })
}

use std::io::{self, BufWriter, Write};

use serde_json::Value;

/// Serializes records one at a time in a fixed output format.
pub trait DocSink {
    fn write_doc(&mut self, doc: &Value) -> io::Result<()>;
    fn finish(self: Box<Self>) -> io::Result<()>;
}

pub struct NdjsonSink<W: Write> {
    w: BufWriter<W>,
}
impl<W: Write> NdjsonSink<W> {
    pub fn new(inner: W) -> Self { Self { w: BufWriter::new(inner) } }
}
impl<W: Write> DocSink for NdjsonSink<W> {
    fn write_doc(&mut self, doc: &Value) -> io::Result<()> {
        serde_json::to_writer(&mut self.w, doc)?;
        self.w.write_all(b"\n")
    }
    fn finish(mut self: Box<Self>) -> io::Result<()> { self.w.flush() }
}

/// A single JSON array, written incrementally.
pub struct JsonArraySink<W: Write> {
    w: BufWriter<W>,
    first: bool,
}
impl<W: Write> JsonArraySink<W> {
    pub fn new(inner: W) -> Self { Self { w: BufWriter::new(inner), first: true } }
}
impl<W: Write> DocSink for JsonArraySink<W> {
    fn write_doc(&mut self, doc: &Value) -> io::Result<()> {
        self.w.write_all(if self.first { b"[\n" } else { b",\n" })?;
        self.first = false;
        serde_json::to_writer(&mut self.w, doc)?;
        Ok(())
    }
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.w.write_all(if self.first { b"[]\n" } else { b"\n]\n" })?;
        self.w.flush()
    }
}

/// Columns come from the first record; later records are projected onto them.
pub struct CsvSink<W: Write> {
    w: csv::Writer<BufWriter<W>>,
    headers: Option<Vec<String>>,
    write_headers: bool,
}
impl<W: Write> CsvSink<W> {
    pub fn new(inner: W, delimiter: u8, write_headers: bool) -> Self {
        let w = csv::WriterBuilder::new().delimiter(delimiter).from_writer(BufWriter::new(inner));
        Self { w, headers: None, write_headers }
    }
}
impl<W: Write> DocSink for CsvSink<W> {
    fn write_doc(&mut self, doc: &Value) -> io::Result<()> {
        if self.headers.is_none() {
            let hdrs: Vec<String> = match doc {
                Value::Object(map) => map.keys().cloned().collect(),
                _ => vec!["value".to_string()],
            };
            if self.write_headers {
                self.w.write_record(&hdrs).map_err(|e| io::Error::other(e.to_string()))?;
            }
            self.headers = Some(hdrs);
        }
        let mut row: Vec<String> = Vec::new();
        if let Some(hdrs) = &self.headers {
            match doc {
                Value::Object(map) => {
                    for k in hdrs {
                        row.push(map.get(k).map(value_to_cell).unwrap_or_default());
                    }
                }
                other => row.push(value_to_cell(other)),
            }
        }
        self.w.write_record(&row).map_err(|e| io::Error::other(e.to_string()))
    }
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.w.flush()
    }
}

fn value_to_cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

//! Streaming XML decoder.
//!
//! Only the subtree of the record currently being decoded is held in memory.
//! Records are the children of the root element. A conventionally named
//! wrapper (`<items>`, `<rows>`, ...) directly below the root contributes its
//! children instead of itself, and its siblings before and after it are still
//! records: the stream is never held back to look for a wrapper further on.
//! JSON, parsed whole, keeps only the wrapper's array. An explicit
//! `record_path` replaces the guess in both formats.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

use super::decoder::{DecodeItem, RecordDecoder};
use super::options::{ImportFormat, XmlOptions};
use super::util::{field_to_value, insert_repeated, is_wrapper_key};
use crate::errors::PipelineError;

enum XmlEvent {
    Start { name: String, attrs: Vec<(String, String)> },
    Empty { name: String, attrs: Vec<(String, String)> },
    End,
    Text(String),
    Eof,
}

struct Frame {
    name: String,
    map: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String, attrs: Vec<(String, String)>, infer: bool) -> Self {
        let mut map = Map::new();
        for (k, v) in attrs {
            insert_repeated(&mut map, k, field_to_value(&v, infer));
        }
        Self { name, map, text: String::new() }
    }

    fn finish(mut self, infer: bool) -> (String, Value) {
        let text = self.text.trim();
        if self.map.is_empty() {
            return (self.name, field_to_value(text, infer));
        }
        if !text.is_empty() {
            self.map.insert("#text".to_string(), field_to_value(text, infer));
        }
        (self.name, Value::Object(self.map))
    }

    /// Records are always objects; a text-only record keeps its element name.
    fn finish_record(self, infer: bool) -> Value {
        if self.map.is_empty() && self.text.trim().is_empty() {
            return Value::Object(Map::new());
        }
        match self.finish(infer) {
            (_, obj @ Value::Object(_)) => obj,
            (name, scalar) => {
                let mut map = Map::new();
                map.insert(name, scalar);
                Value::Object(map)
            }
        }
    }
}

pub struct XmlDecoder<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    stack: Vec<String>,
    record_path: Option<Vec<String>>,
    type_infer: bool,
    done: bool,
}

impl<R: BufRead> XmlDecoder<R> {
    pub fn new(reader: R, opts: &XmlOptions) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);
        let record_path = opts.record_path.as_ref().map(|p| {
            p.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect::<Vec<_>>()
        });
        Self {
            reader,
            buf: Vec::with_capacity(8 * 1024),
            stack: Vec::new(),
            record_path: record_path.filter(|p| !p.is_empty()),
            type_infer: opts.type_infer,
            done: false,
        }
    }

    fn is_record(&self, name: &str) -> bool {
        let depth = self.stack.len();
        if let Some(path) = &self.record_path {
            return depth + 1 == path.len()
                && self.stack.iter().zip(path.iter()).all(|(a, b)| a == b)
                && path[depth] == name;
        }
        match depth {
            1 => !is_wrapper_key(name),
            2 => is_wrapper_key(&self.stack[1]),
            _ => false,
        }
    }

    fn next_event(&mut self) -> Result<XmlEvent, PipelineError> {
        loop {
            self.buf.clear();
            let ev = self.reader.read_event_into(&mut self.buf).map_err(xml_err)?;
            let owned = match ev {
                Event::Start(e) => {
                    let (name, attrs) = element_parts(&e)?;
                    XmlEvent::Start { name, attrs }
                }
                Event::Empty(e) => {
                    let (name, attrs) = element_parts(&e)?;
                    XmlEvent::Empty { name, attrs }
                }
                Event::End(_) => XmlEvent::End,
                Event::Text(t) => XmlEvent::Text(t.unescape().map_err(xml_err)?.into_owned()),
                Event::CData(c) => XmlEvent::Text(String::from_utf8_lossy(&c).into_owned()),
                Event::Eof => XmlEvent::Eof,
                _ => continue,
            };
            return Ok(owned);
        }
    }

    fn read_record(&mut self, root: Frame) -> Result<Value, PipelineError> {
        let infer = self.type_infer;
        let mut frames = vec![root];
        loop {
            match self.next_event()? {
                XmlEvent::Start { name, attrs } => frames.push(Frame::new(name, attrs, infer)),
                XmlEvent::Empty { name, attrs } => {
                    let (k, v) = Frame::new(name, attrs, infer).finish(infer);
                    if let Some(parent) = frames.last_mut() {
                        insert_repeated(&mut parent.map, k, v);
                    }
                }
                XmlEvent::Text(t) => {
                    if let Some(top) = frames.last_mut() {
                        top.text.push_str(&t);
                    }
                }
                XmlEvent::End => {
                    let Some(frame) = frames.pop() else {
                        return Err(PipelineError::decode(ImportFormat::Xml, "unbalanced element"));
                    };
                    match frames.last_mut() {
                        Some(parent) => {
                            let (k, v) = frame.finish(infer);
                            insert_repeated(&mut parent.map, k, v);
                        }
                        None => return Ok(frame.finish_record(infer)),
                    }
                }
                XmlEvent::Eof => {
                    return Err(PipelineError::decode(
                        ImportFormat::Xml,
                        "unexpected end of document inside a record",
                    ));
                }
            }
        }
    }
}

impl<R: BufRead + Send> RecordDecoder for XmlDecoder<R> {
    fn next_item(&mut self) -> Result<Option<DecodeItem>, PipelineError> {
        while !self.done {
            match self.next_event()? {
                XmlEvent::Start { name, attrs } => {
                    if self.is_record(&name) {
                        let frame = Frame::new(name, attrs, self.type_infer);
                        return self.read_record(frame).map(|v| Some(DecodeItem::Record(v)));
                    }
                    self.stack.push(name);
                }
                XmlEvent::Empty { name, attrs } => {
                    if self.is_record(&name) {
                        let record = Frame::new(name, attrs, self.type_infer).finish_record(self.type_infer);
                        return Ok(Some(DecodeItem::Record(record)));
                    }
                }
                XmlEvent::End => {
                    self.stack.pop();
                }
                XmlEvent::Text(_) => {}
                XmlEvent::Eof => {
                    self.done = true;
                    if !self.stack.is_empty() {
                        return Err(PipelineError::decode(
                            ImportFormat::Xml,
                            format!("unexpected end of document; <{}> is not closed", self.stack.join("/")),
                        ));
                    }
                }
            }
        }
        Ok(None)
    }

    fn bytes_consumed(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn format(&self) -> ImportFormat {
        ImportFormat::Xml
    }
}

type Parts = (String, Vec<(String, String)>);

fn element_parts(e: &BytesStart<'_>) -> Result<Parts, PipelineError> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        attrs.push((key, value));
    }
    Ok((name, attrs))
}

fn xml_err(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::decode(ImportFormat::Xml, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::decoder::decode_all;
    use serde_json::json;

    fn decode(xml: &str, path: Option<&str>) -> Result<Vec<Value>, PipelineError> {
        let opts = XmlOptions { record_path: path.map(String::from), ..Default::default() };
        let mut d = XmlDecoder::new(xml.as_bytes(), &opts);
        decode_all(&mut d)
    }

    #[test]
    fn children_of_root_are_records() {
        let xml = r#"<?xml version="1.0"?>
            <people>
              <person id="1"><name>Alice</name><age>30</age></person>
              <person id="2"><name>Bob</name><age>41</age></person>
            </people>"#;
        let recs = decode(xml, None).unwrap();
        assert_eq!(recs, vec![
            json!({"id": 1, "name": "Alice", "age": 30}),
            json!({"id": 2, "name": "Bob", "age": 41}),
        ]);
    }

    #[test]
    fn conventional_wrapper_is_unwrapped() {
        let xml = "<export><items><item><sku>A</sku></item><item><sku>B</sku></item></items></export>";
        let recs = decode(xml, None).unwrap();
        assert_eq!(recs, vec![json!({"sku": "A"}), json!({"sku": "B"})]);
    }

    #[test]
    fn wrapper_siblings_stay_records() {
        let xml = "<export><meta><v>1</v></meta><items><item><sku>A</sku></item><item><sku>B</sku></item></items><end/></export>";
        let recs = decode(xml, None).unwrap();
        assert_eq!(recs, vec![json!({"v": 1}), json!({"sku": "A"}), json!({"sku": "B"}), json!({})]);
    }

    #[test]
    fn record_path_overrides_guess() {
        let xml = "<doc><meta><v>1</v></meta><list><e n=\"1\"/><e n=\"2\"/></list></doc>";
        assert_eq!(decode(xml, Some("doc/list/e")).unwrap(), vec![json!({"n": 1}), json!({"n": 2})]);
        // Without the override both <meta> and <list> are treated as records.
        assert_eq!(decode(xml, None).unwrap().len(), 2);
    }

    #[test]
    fn repeated_children_mixed_text_and_entities() {
        let xml = "<r><row><tag>a</tag><tag>b</tag><note lang=\"en\">x &amp; y</note></row></r>";
        let recs = decode(xml, None).unwrap();
        assert_eq!(recs[0], json!({"tag": ["a", "b"], "note": {"lang": "en", "#text": "x & y"}}));
    }

    #[test]
    fn corrupt_documents_fail() {
        assert!(matches!(decode("<r><row><a>1</b></row></r>", None), Err(PipelineError::Decode { .. })));
        assert!(matches!(decode("<r><row><a>1</a>", None), Err(PipelineError::Decode { .. })));
    }

    #[test]
    fn empty_and_text_only_records() {
        let recs = decode("<r><row/><row>plain</row></r>", None).unwrap();
        assert_eq!(recs, vec![json!({}), json!({"row": "plain"})]);
        assert!(decode("", None).unwrap().is_empty());
        assert!(decode("<rows/>", None).unwrap().is_empty());
    }

    #[test]
    fn tracks_byte_position() {
        let xml = "<r><row><a>1</a></row><row><a>2</a></row></r>";
        let mut d = XmlDecoder::new(xml.as_bytes(), &XmlOptions::default());
        d.next_item().unwrap();
        let first = d.bytes_consumed();
        assert!(first > 0 && first < xml.len() as u64);
        while d.next_item().unwrap().is_some() {}
        assert_eq!(d.bytes_consumed(), xml.len() as u64);
    }
}

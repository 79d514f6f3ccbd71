//! Format detection heuristics for import.
//!
//! Resolution order: file name extension, then content type, then a peek at
//! the first bytes of the input. The lookup tables are process-wide and never
//! mutated after initialization.

use std::collections::HashMap;
use std::io::{self, BufRead};
use std::sync::LazyLock;

use super::ImportFormat;

struct FormatTable {
    by_extension: HashMap<&'static str, ImportFormat>,
    by_mime: HashMap<&'static str, ImportFormat>,
}

static FORMAT_TABLE: LazyLock<FormatTable> = LazyLock::new(|| {
    let by_extension = HashMap::from([
        ("csv", ImportFormat::Csv),
        ("tsv", ImportFormat::Csv),
        ("txt", ImportFormat::Csv),
        ("json", ImportFormat::Json),
        ("jsonl", ImportFormat::Ndjson),
        ("ndjson", ImportFormat::Ndjson),
        ("xml", ImportFormat::Xml),
        ("xlsx", ImportFormat::Spreadsheet),
        ("xlsm", ImportFormat::Spreadsheet),
        ("xlsb", ImportFormat::Spreadsheet),
        ("xls", ImportFormat::Spreadsheet),
        ("ods", ImportFormat::Spreadsheet),
    ]);
    let by_mime = HashMap::from([
        ("text/csv", ImportFormat::Csv),
        ("text/tab-separated-values", ImportFormat::Csv),
        ("application/csv", ImportFormat::Csv),
        ("application/json", ImportFormat::Json),
        ("text/json", ImportFormat::Json),
        ("application/x-ndjson", ImportFormat::Ndjson),
        ("application/jsonl", ImportFormat::Ndjson),
        ("application/xml", ImportFormat::Xml),
        ("text/xml", ImportFormat::Xml),
        ("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", ImportFormat::Spreadsheet),
        ("application/vnd.ms-excel", ImportFormat::Spreadsheet),
        ("application/vnd.oasis.opendocument.spreadsheet", ImportFormat::Spreadsheet),
    ]);
    FormatTable { by_extension, by_mime }
});

pub fn format_from_name(name: &str) -> Option<ImportFormat> {
    let (_, ext) = name.rsplit_once('.')?;
    FORMAT_TABLE.by_extension.get(ext.to_ascii_lowercase().as_str()).copied()
}

pub fn format_from_content_type(content_type: &str) -> Option<ImportFormat> {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    FORMAT_TABLE.by_mime.get(essence.as_str()).copied()
}

/// Guess the format from the first bytes of the input.
pub fn sniff(head: &[u8]) -> Option<ImportFormat> {
    if head.starts_with(b"PK\x03\x04") || head.starts_with(b"\xD0\xCF\x11\xE0") {
        return Some(ImportFormat::Spreadsheet);
    }
    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    if head.contains(&0) {
        return None;
    }
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start();
    match trimmed.chars().next() {
        None => None,
        Some('<') => Some(ImportFormat::Xml),
        Some('[') => Some(ImportFormat::Json),
        Some('{') if looks_line_delimited(trimmed.as_bytes()) => Some(ImportFormat::Ndjson),
        Some('{') => Some(ImportFormat::Json),
        Some(_) => Some(ImportFormat::Csv),
    }
}

/// Several objects on consecutive lines means NDJSON. A first value that does
/// not end inside `head` is left to the JSON decoder, which re-checks the
/// whole buffer.
pub(crate) fn looks_line_delimited(head: &[u8]) -> bool {
    let mut values = serde_json::Deserializer::from_slice(head).into_iter::<serde::de::IgnoredAny>();
    if !matches!(values.next(), Some(Ok(_))) {
        return false;
    }
    let rest = &head[values.byte_offset()..];
    let gap = rest.iter().take_while(|b| b.is_ascii_whitespace()).count();
    rest[..gap].contains(&b'\n') && rest.get(gap) == Some(&b'{')
}

/// Pick the most likely CSV delimiter from the header line.
pub fn sniff_delimiter(head: &[u8]) -> Option<u8> {
    let text = String::from_utf8_lossy(head);
    let line = text.lines().next()?;
    [b',', b'\t', b';', b'|']
        .into_iter()
        .map(|d| (d, line.bytes().filter(|b| *b == d).count()))
        .filter(|(_, n)| *n > 0)
        .max_by_key(|(_, n)| *n)
        .map(|(d, _)| d)
}

/// Resolve the format of an input without consuming any of it.
///
/// # Errors
/// Returns I/O errors raised while peeking at the reader.
pub fn detect_format<R: BufRead>(
    reader: &mut R,
    name: Option<&str>,
    content_type: Option<&str>,
) -> io::Result<Option<ImportFormat>> {
    if let Some(fmt) = name.and_then(format_from_name) {
        return Ok(Some(fmt));
    }
    if let Some(fmt) = content_type.and_then(format_from_content_type) {
        return Ok(Some(fmt));
    }
    let buf = reader.fill_buf()?; // peek without consuming
    Ok(sniff(&buf[..buf.len().min(4096)]))
}

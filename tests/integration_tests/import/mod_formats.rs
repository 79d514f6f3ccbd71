use ingestlite::import::{ImportFormat, ImportOptions, ImportSource, import, import_file};
use serde_json::{Value, json};
use std::path::Path;

fn records(src: ImportSource, opts: ImportOptions) -> Vec<Value> {
    let mut run = import(src, opts);
    let out = run.by_ref().flat_map(|b| b.unwrap().records).collect();
    assert!(run.errors().is_empty(), "{:?}", run.errors());
    out
}

fn file_records(path: &Path) -> Vec<Value> {
    let mut run = import_file(path, ImportOptions::default());
    let out: Vec<Value> = run.by_ref().flat_map(|b| b.unwrap().records).collect();
    out
}

#[test]
fn each_format_is_detected_from_its_extension() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        ("a.csv", "sku,qty\nA1,3\n"),
        ("a.json", "{\"items\": [{\"sku\": \"A1\", \"qty\": 3}]}"),
        ("a.ndjson", "{\"sku\": \"A1\", \"qty\": 3}\n"),
        ("a.xml", "<inventory><item><sku>A1</sku><qty>3</qty></item></inventory>"),
    ];
    for (name, body) in cases {
        let p = dir.path().join(name);
        std::fs::write(&p, body).unwrap();
        assert_eq!(file_records(&p), vec![json!({"sku": "A1", "qty": 3})], "{name}");
    }
}

#[test]
fn content_type_and_sniffing_resolve_unnamed_input() {
    let src = ImportSource::bytes(&b"[{\"a\": true}]"[..]).with_content_type("application/json; charset=utf-8");
    assert_eq!(records(src, ImportOptions::default()), vec![json!({"a": true})]);

    let src = ImportSource::bytes(&b"{\"a\":1}\n{\"a\":2}\n"[..]);
    assert_eq!(records(src, ImportOptions::default()).len(), 2);

    let src = ImportSource::bytes(&b"a;b\n1;x\n"[..]);
    assert_eq!(records(src, ImportOptions::default()), vec![json!({"a": 1, "b": "x"})]);
}

#[test]
fn bom_prefixed_csv() {
    let src = ImportSource::bytes(&b"\xEF\xBB\xBFname,zip\nAda,007\n"[..]).with_name("bom.csv");
    assert_eq!(records(src, ImportOptions::default()), vec![json!({"name": "Ada", "zip": "007"})]);
}

#[test]
fn record_path_applies_to_json_and_xml() {
    let mut opts = ImportOptions::default();
    opts.json.record_path = Some("payload.list".into());
    let src = ImportSource::bytes(&b"{\"payload\": {\"list\": [1, 2]}, \"rows\": [9]}"[..]).with_name("x.json");
    assert_eq!(records(src, opts), vec![json!(1), json!(2)]);

    let mut opts = ImportOptions::default();
    opts.xml.record_path = Some("feed/entry".into());
    let xml = "<feed><title>t</title><entry id=\"1\"/><entry id=\"2\"><tag>a</tag><tag>b</tag></entry></feed>";
    let src = ImportSource::bytes(xml.as_bytes()).with_name("feed.xml");
    assert_eq!(records(src, opts), vec![json!({"id": 1}), json!({"id": 2, "tag": ["a", "b"]})]);
}

#[test]
fn explicit_format_wins_over_extension() {
    let src = ImportSource::bytes(&b"{\"a\":1}\n"[..]).with_name("data.csv");
    let opts = ImportOptions::default().with_format(ImportFormat::Ndjson);
    assert_eq!(records(src, opts), vec![json!({"a": 1})]);
}

#[test]
fn csv_column_mismatch_is_recoverable() {
    let src = ImportSource::bytes(&b"a,b\n1,2\n3\n4,5\n"[..]).with_name("x.csv");
    let mut run = import(src, ImportOptions::default());
    let n: usize = run.by_ref().map(|b| b.unwrap().len()).sum();
    assert_eq!(n, 2);
    assert_eq!(run.errors().len(), 1);
    assert_eq!(run.errors()[0].record_index, 2);
    assert!(run.errors()[0].message.contains("expected 2 fields"));
}

#[test]
fn corrupt_spreadsheet_is_a_decode_error() {
    let src = ImportSource::bytes(&b"PK\x03\x04not really a zip"[..]).with_name("book.xlsx");
    let first = import(src, ImportOptions::default()).next().unwrap();
    assert!(first.is_err());
}

#[test]
fn ndjson_with_records_longer_than_the_detection_window() {
    let body: String = (0..3).map(|i| format!("{{\"i\": {i}, \"text\": \"{}\"}}\n", "x".repeat(5000))).collect();
    let mut run = import(ImportSource::bytes(body.into_bytes()), ImportOptions::default());
    let ids: Vec<Value> = run.by_ref().flat_map(|b| b.unwrap().records).map(|r| r["i"].clone()).collect();
    assert_eq!(ids, vec![json!(0), json!(1), json!(2)]);
    assert_eq!(run.format(), ImportFormat::Ndjson);
}

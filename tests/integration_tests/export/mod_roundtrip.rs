use ingestlite::export::{ExportFormat, ExportOptions, export_file, export_to_writer};
use ingestlite::import::{ImportOptions, import_file};
use serde_json::{Value, json};

fn people() -> Vec<Value> {
    vec![
        json!({"name": "Alice", "age": 30, "active": true}),
        json!({"name": "Bob", "age": 41, "active": false}),
        json!({"name": "Cara", "age": 25.5, "active": true}),
    ]
}

fn reimport(path: &std::path::Path) -> Vec<Value> {
    let mut run = import_file(path, ImportOptions::default());
    let out: Vec<Value> = run.by_ref().flat_map(|b| b.unwrap().records).collect();
    assert!(run.errors().is_empty());
    out
}

#[test]
fn csv_export_imports_back_equal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.csv");
    let opts = ExportOptions { format: ExportFormat::Csv, ..Default::default() };
    let report = export_file(people(), &path, &opts).unwrap();
    assert_eq!(report.written, 3);
    assert_eq!(reimport(&path), people());
    let header = std::fs::read_to_string(&path).unwrap();
    assert!(header.starts_with("name,age,active\n"));
}

#[test]
fn json_and_ndjson_exports_import_back_equal() {
    let dir = tempfile::tempdir().unwrap();
    for (name, format) in [("p.json", ExportFormat::Json), ("p.ndjson", ExportFormat::Ndjson)] {
        let path = dir.path().join(name);
        let opts = ExportOptions { format, ..Default::default() };
        export_file(people(), &path, &opts).unwrap();
        assert_eq!(reimport(&path), people(), "{name}");
    }
}

#[test]
fn export_replaces_existing_file_and_honours_limit_and_redaction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.ndjson");
    std::fs::write(&path, "stale\n").unwrap();
    let opts = ExportOptions { limit: Some(2), redact_fields: Some(vec!["age".into()]), ..Default::default() };
    let report = export_file(people(), &path, &opts).unwrap();
    assert_eq!(report.written, 2);
    let back = reimport(&path);
    assert_eq!(back.len(), 2);
    assert_eq!(back[0]["name"], "Alice");
    assert_ne!(back[0]["age"], json!(30));
}

#[test]
fn empty_json_export_is_an_empty_array() {
    let mut buf = Vec::new();
    let opts = ExportOptions { format: ExportFormat::Json, ..Default::default() };
    export_to_writer(Vec::<Value>::new(), &mut buf, &opts).unwrap();
    let v: Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(v, json!([]));
}

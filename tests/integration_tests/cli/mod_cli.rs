use ingestlite::cli::{Command, OutputMode, run_with_format};
use ingestlite::config::AppConfig;
use ingestlite::import::ImportOptions;
use std::path::Path;

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, body).unwrap();
    p
}

#[test]
fn import_reports_rejections_in_plain_mode() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(dir.path(), "schema.toml", "[[fields]]\nname = \"age\"\nkind = \"number\"\nrequired = true\n");
    let file = write(dir.path(), "people.csv", "name,age\nAlice,30\nBob,x\nCara,25\n");
    let cfg = AppConfig { schema: Some(schema), batch_size: Some(1), ..Default::default() };
    let mut out = Vec::new();
    run_with_format(
        Command::Import { file, emit_records: false },
        cfg.to_import_options().unwrap(),
        OutputMode::Plain,
        &mut out,
    )
    .unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "state=Completed format=csv imported=2 rejected=1 batches=2\n"
    );
}

#[test]
fn import_can_stream_records() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "x.xml", "<rows><row><a>1</a></row><row><a>2</a></row></rows>");
    let mut out = Vec::new();
    run_with_format(Command::Import { file, emit_records: true }, ImportOptions::default(), OutputMode::Json, &mut out)
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":1}\n{\"a\":2}\n");
}

#[test]
fn convert_csv_to_ndjson() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "in.csv", "k,v\na,1\nb,2\n");
    let output = dir.path().join("out.jsonl");
    let mut out = Vec::new();
    run_with_format(
        Command::Convert { input, output: output.clone(), to: None },
        ImportOptions::default(),
        OutputMode::Plain,
        &mut out,
    )
    .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "written=2 rejected=0\n");
    assert_eq!(std::fs::read_to_string(output).unwrap(), "{\"k\":\"a\",\"v\":1}\n{\"k\":\"b\",\"v\":2}\n");
}

#[test]
fn fatal_errors_are_returned_after_the_summary() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "bad.json", "{\"rows\": [1, 2");
    let mut out = Vec::new();
    let err = run_with_format(Command::Import { file, emit_records: false }, ImportOptions::default(), OutputMode::Human, &mut out)
        .unwrap_err();
    assert!(err.to_string().contains("json"));
    assert!(String::from_utf8(out).unwrap().starts_with("import aborted:"));
}

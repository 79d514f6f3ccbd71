use ingestlite::errors::PipelineError;
use ingestlite::import::{
    FieldKind, FieldRule, ImportFormat, ImportOptions, ImportSource, RecordSchema, RunState, import, import_bytes,
    import_file,
};
use ingestlite::types::Batch;
use parking_lot::Mutex;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn numbered_csv(n: usize) -> String {
    let mut s = String::from("id,label\n");
    for i in 1..=n {
        s.push_str(&format!("{i},row{i}\n"));
    }
    s
}

#[test]
fn batches_are_ceil_r_over_b_and_ordered() {
    for (rows, batch) in [(0usize, 3usize), (1, 3), (9, 3), (10, 3), (250, 100)] {
        let opts = ImportOptions::default().with_format(ImportFormat::Csv).with_batch_size(batch);
        let batches: Vec<Batch> = import_bytes(numbered_csv(rows), opts).collect::<Result<_, _>>().unwrap();
        assert_eq!(batches.len(), rows.div_ceil(batch), "rows={rows} batch={batch}");
        let ids: Vec<i64> = batches.iter().flat_map(|b| b.records.iter()).map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, (1..=rows as i64).collect::<Vec<_>>());
        for (i, b) in batches.iter().enumerate() {
            assert_eq!(b.index, i);
            assert!(b.len() <= batch);
        }
    }
}

#[test]
fn percentage_is_monotonic_and_reaches_100() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s2 = Arc::clone(&seen);
    let opts = ImportOptions::default()
        .with_format(ImportFormat::Csv)
        .with_chunk_size(64)
        .on_progress(move |p| s2.lock().push((p.percentage, p.current_chunk_index, p.processed_bytes)));
    let mut run = import_bytes(numbered_csv(200), opts);
    run.by_ref().for_each(|b| drop(b.unwrap()));
    let seen = seen.lock();
    assert!(seen.len() > 5);
    for w in seen.windows(2) {
        assert!(w[0].0 <= w[1].0 && w[0].1 <= w[1].1 && w[0].2 <= w[1].2, "{w:?}");
    }
    assert_eq!(seen.last().unwrap().0, 100.0);
    assert!(seen.iter().all(|(p, _, _)| (0.0..=100.0).contains(p)));
}

#[test]
fn unknown_size_reports_zero_until_done() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s2 = Arc::clone(&seen);
    let src = ImportSource::reader(Cursor::new(numbered_csv(50).into_bytes()), None);
    let opts = ImportOptions::default()
        .with_format(ImportFormat::Csv)
        .with_chunk_size(32)
        .on_progress(move |p| s2.lock().push(p.percentage));
    let summary = {
        let mut run = import(src, opts);
        run.by_ref().for_each(drop);
        run.finish()
    };
    let seen = seen.lock();
    let (last, rest) = seen.split_last().unwrap();
    assert!(rest.iter().all(|p| *p == 0.0));
    assert_eq!(*last, 100.0);
    let progress = summary.progress.unwrap();
    assert_eq!(progress.total_bytes, progress.processed_bytes);
}

#[test]
fn each_failing_record_gets_one_error_at_its_index() {
    let data = "{\"v\":1}\n{\"v\":2}\n{oops\n{\"v\":4}\n{\"v\":5}\n{\"v\":6}\nnot json\n{\"v\":8}\n";
    let reported = Arc::new(Mutex::new(Vec::new()));
    let r2 = Arc::clone(&reported);
    let opts = ImportOptions::default()
        .with_format(ImportFormat::Ndjson)
        .with_batch_size(2)
        .validate_with(|r| r["v"] != json!(5))
        .on_error(move |e| r2.lock().push(e.record_index));
    let mut run = import_bytes(data, opts);
    let batches: Vec<Batch> = run.by_ref().collect::<Result<_, _>>().unwrap();
    let accepted: Vec<i64> = batches.iter().flat_map(|b| b.records.iter()).map(|r| r["v"].as_i64().unwrap()).collect();
    assert_eq!(accepted, vec![1, 2, 4, 6, 8]);
    let idx: Vec<u64> = run.errors().iter().map(|e| e.record_index).collect();
    assert_eq!(idx, vec![3, 5, 7]);
    assert_eq!(*reported.lock(), idx);
    assert!(run.errors().iter().all(|e| e.offending_record.is_some()));
    let summary = run.finish();
    assert_eq!((summary.records_imported, summary.records_rejected), (5, 3));
    assert_eq!(summary.progress.unwrap().errors.len(), 3);
}

#[test]
fn schema_errors_from_file_carry_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("people.csv");
    std::fs::write(&csv, "name,age\nAlice,30\nBob,notanumber\nCara,25\n").unwrap();
    let schema = RecordSchema::new(vec![
        FieldRule::new("name", FieldKind::String).required(),
        FieldRule::new("age", FieldKind::Number).required(),
    ]);
    let mut run = import_file(&csv, ImportOptions::default().with_validator(schema));
    let names: Vec<String> = run
        .by_ref()
        .flat_map(|b| b.unwrap().records)
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Alice", "Cara"]);
    let e = &run.errors()[0];
    assert_eq!((e.record_index, e.field.as_deref()), (2, Some("age")));
    assert_eq!(run.finish().progress.unwrap().percentage, 100.0);
}

#[test]
fn cancellation_stops_batches_and_callbacks() {
    let token = CancellationToken::new();
    let calls = Arc::new(Mutex::new(0usize));
    let c1 = Arc::clone(&calls);
    let c2 = Arc::clone(&calls);
    let opts = ImportOptions::default()
        .with_format(ImportFormat::Csv)
        .with_batch_size(5)
        .with_chunk_size(16)
        .validate_with(|r| r["id"].as_i64().unwrap_or(0) % 7 != 0)
        .on_progress(move |_| *c1.lock() += 1)
        .on_error(move |_| *c2.lock() += 1)
        .with_cancellation(token.clone());
    let mut run = import_bytes(numbered_csv(100), opts);
    assert!(run.next().unwrap().is_ok());
    token.cancel();
    let before = *calls.lock();
    assert!(run.next().is_none());
    assert!(run.next().is_none());
    assert_eq!(*calls.lock(), before);
    assert_eq!(run.state(), RunState::Cancelled);
    let summary = run.finish();
    assert_eq!(summary.batches, 1);
    assert!(summary.outcome().starts_with("import cancelled"));
}

#[test]
fn cancelling_before_start_yields_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let opts = ImportOptions::default().with_format(ImportFormat::Csv).with_cancellation(token);
    let mut run = import_bytes(numbered_csv(3), opts);
    assert!(run.next().is_none());
    assert_eq!(run.state(), RunState::Cancelled);
}

#[test]
fn empty_input_completes_at_100() {
    for fmt in [
        ImportFormat::Csv,
        ImportFormat::Json,
        ImportFormat::Ndjson,
        ImportFormat::Xml,
        ImportFormat::Spreadsheet,
        ImportFormat::Auto,
    ] {
        let mut run = import_bytes(Vec::new(), ImportOptions::default().with_format(fmt));
        assert!(run.next().is_none(), "{fmt}");
        let s = run.finish();
        assert_eq!((s.state, s.batches, s.errors.len()), (RunState::Completed, 0, 0), "{fmt}");
        assert_eq!(s.progress.as_ref().unwrap().percentage, 100.0);
        assert_eq!(s.outcome(), "0 records imported, 0 errors");
    }
    let mut run = import(ImportSource::bytes(Vec::new()).with_name("upload.xlsx"), ImportOptions::default());
    assert!(run.next().is_none());
    let s = run.finish();
    assert_eq!((s.state, s.format, s.batches), (RunState::Completed, ImportFormat::Spreadsheet, 0));
}

#[test]
fn oversized_input_fails_before_batches_and_progress() {
    let calls = Arc::new(Mutex::new(0usize));
    let c = Arc::clone(&calls);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.csv");
    std::fs::write(&path, numbered_csv(500)).unwrap();
    let opts = ImportOptions::default().with_max_input_bytes(1024).on_progress(move |_| *c.lock() += 1);
    let mut run = import_file(&path, opts);
    match run.next() {
        Some(Err(PipelineError::SizeLimitExceeded { size, limit })) => {
            assert!(size > limit);
            assert_eq!(limit, 1024);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(run.next().is_none());
    assert_eq!(*calls.lock(), 0);
    let s = run.finish();
    assert_eq!(s.state, RunState::Failed);
    assert!(s.outcome().starts_with("import aborted:"));
}

#[test]
fn undeclared_stream_is_stopped_at_the_ceiling() {
    let src = ImportSource::reader(Cursor::new(numbered_csv(500).into_bytes()), None);
    let opts = ImportOptions::default().with_format(ImportFormat::Csv).with_max_input_bytes(2048);
    let results: Vec<_> = import(src, opts).collect();
    assert!(matches!(results.last(), Some(Err(PipelineError::SizeLimitExceeded { .. }))));
}

#[test]
fn fatal_decode_error_keeps_earlier_batches() {
    let data = "<rows><row><a>1</a></row><row><a>2</a></row><row><a>3</b></row></rows>";
    let opts = ImportOptions::default().with_format(ImportFormat::Xml).with_batch_size(1);
    let results: Vec<_> = import_bytes(data, opts).collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok() && results[1].is_ok());
    assert!(matches!(results[2], Err(PipelineError::Decode { format: ImportFormat::Xml, .. })));
}

#[test]
fn transformer_output_is_what_gets_batched() {
    let opts = ImportOptions::default().with_format(ImportFormat::Csv).transform_with(|mut r| {
        r["label"] = json!(r["label"].as_str().unwrap_or_default().to_uppercase());
        Ok(r)
    });
    let batches: Vec<Batch> = import_bytes(numbered_csv(2), opts).collect::<Result<_, _>>().unwrap();
    assert_eq!(batches[0].records, vec![json!({"id": 1, "label": "ROW1"}), json!({"id": 2, "label": "ROW2"})]);
}

#[test]
fn any_positive_batch_size_is_accepted() {
    let opts = ImportOptions::default().with_format(ImportFormat::Csv).with_batch_size(usize::MAX);
    let batches: Vec<Batch> = import_bytes(numbered_csv(3), opts).collect::<Result<_, _>>().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
}

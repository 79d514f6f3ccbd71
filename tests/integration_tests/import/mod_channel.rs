use ingestlite::import::{ImportFormat, ImportOptions, RunState, spawn_import};

#[tokio::test]
async fn async_consumer_sees_batches_and_summary() {
    let data: String = std::iter::once("n\n".to_string()).chain((0..25).map(|i| format!("{i}\n"))).collect();
    let opts = ImportOptions::default()
        .with_format(ImportFormat::Csv)
        .with_batch_size(10)
        .validate_with(|r| r["n"].as_i64() != Some(13));
    let mut handle = spawn_import(data.into_bytes(), opts, 2);
    let mut sizes = Vec::new();
    while let Some(b) = handle.recv().await {
        sizes.push(b.unwrap().len());
    }
    assert_eq!(sizes, vec![10, 10, 4]);
    let summary = handle.finish().await.unwrap();
    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.errors[0].record_index, 14);
}

#[tokio::test]
async fn handle_cancel_stops_the_worker() {
    let data: String = std::iter::once("n\n".to_string()).chain((0..10_000).map(|i| format!("{i}\n"))).collect();
    let opts = ImportOptions::default().with_format(ImportFormat::Csv).with_batch_size(1);
    let mut handle = spawn_import(data.into_bytes(), opts, 1);
    assert!(handle.recv().await.is_some());
    handle.cancel();
    while handle.recv().await.is_some() {}
    let summary = handle.finish().await.unwrap();
    assert_eq!(summary.state, RunState::Cancelled);
}

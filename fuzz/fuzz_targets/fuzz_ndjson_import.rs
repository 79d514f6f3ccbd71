#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16384 { return; }
    let opts = ingestlite::import::ImportOptions::default()
        .with_format(ingestlite::import::ImportFormat::Ndjson)
        .with_chunk_size(64);
    let mut run = ingestlite::import::import_bytes(data, opts);
    while let Some(Ok(_)) = run.next() {}
    let summary = run.finish();
    // Malformed lines are rejected, never dropped silently.
    if let Some(p) = summary.progress {
        assert!(p.processed_records >= summary.records_imported + summary.records_rejected);
    }
});

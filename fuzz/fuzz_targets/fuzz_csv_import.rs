#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16384 { return; }
    let opts = ingestlite::import::ImportOptions::default()
        .with_format(ingestlite::import::ImportFormat::Csv)
        .with_batch_size(7);
    for batch in ingestlite::import::import_bytes(data, opts) {
        if batch.is_err() { break; }
    }
});

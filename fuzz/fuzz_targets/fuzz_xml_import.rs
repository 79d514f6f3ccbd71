#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16384 { return; }
    let opts = ingestlite::import::ImportOptions::default().with_format(ingestlite::import::ImportFormat::Xml);
    let _ = ingestlite::import::import_bytes(data, opts).count();
});

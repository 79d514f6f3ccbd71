use ingestlite::import::{ImportFormat, ImportOptions, import_bytes};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn batch_count_and_order(values in proptest::collection::vec(-1_000_000i64..1_000_000, 0..300), batch in 1usize..50, chunk in 1usize..512) {
        let mut csv = String::from("n\n");
        for v in &values {
            csv.push_str(&format!("{v}\n"));
        }
        let opts = ImportOptions::default().with_format(ImportFormat::Csv).with_batch_size(batch).with_chunk_size(chunk);
        let batches: Vec<_> = import_bytes(csv, opts).collect::<Result<Vec<_>, _>>().unwrap();
        prop_assert_eq!(batches.len(), values.len().div_ceil(batch));
        let got: Vec<i64> = batches.iter().flat_map(|b| b.records.iter()).map(|r| r["n"].as_i64().unwrap()).collect();
        prop_assert_eq!(got, values);
    }

    #[test]
    fn rejected_records_never_reach_batches(flags in proptest::collection::vec(any::<bool>(), 0..200)) {
        let body: String = flags.iter().map(|ok| format!("{}\n", json!({"ok": ok}))).collect();
        let opts = ImportOptions::default().with_format(ImportFormat::Ndjson).with_batch_size(7).validate_with(|r| r["ok"] == json!(true));
        let mut run = import_bytes(body, opts);
        let accepted: usize = run.by_ref().map(|b| b.unwrap().records.iter().filter(|r| r["ok"] == json!(true)).count()).sum();
        let expected_errors: Vec<u64> = flags.iter().enumerate().filter(|(_, ok)| !**ok).map(|(i, _)| i as u64 + 1).collect();
        let indices: Vec<u64> = run.errors().iter().map(|e| e.record_index).collect();
        prop_assert_eq!(accepted, flags.iter().filter(|ok| **ok).count());
        prop_assert_eq!(indices, expected_errors);
    }

    #[test]
    fn arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut run = import_bytes(data, ImportOptions::default());
        for item in run.by_ref() {
            let _ = item;
        }
        prop_assert!(run.state().is_terminal());
    }
}

use ingestlite::import::{ImportFormat, ImportOptions, import_bytes};
use ingestlite::utils::logger::configure_logging;

// The only test in this binary that installs the global logger.
#[test]
fn runs_write_app_and_metrics_logs() {
    let dir = tempfile::tempdir().unwrap();
    configure_logging(Some(dir.path()), Some("info"), Some(2)).unwrap();
    let mut run = import_bytes("a\n1\n2\n", ImportOptions::default().with_format(ImportFormat::Csv));
    run.by_ref().for_each(drop);
    drop(run.finish());
    log::logger().flush();

    let app = std::fs::read_to_string(dir.path().join("ingestlite.log")).unwrap();
    let metrics = std::fs::read_to_string(dir.path().join("metrics.log")).unwrap();
    assert!(app.contains("format=csv"), "{app}");
    assert!(metrics.contains("ingestlite::metrics"), "{metrics}");
    assert!(!app.contains("ingestlite::metrics"));
    assert!(!dir.path().join("dev6.log").exists());

    // A second install is refused rather than replacing the first.
    assert!(configure_logging(Some(dir.path()), None, None).is_err());
}

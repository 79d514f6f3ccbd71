use std::path::PathBuf;

/// A parsed CLI action. Import options are resolved separately from flags,
/// environment and config files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Import {
        file: PathBuf,
        // stream accepted records to stdout as NDJSON
        emit_records: bool,
    },
    Detect {
        file: PathBuf,
    },
    Convert {
        input: PathBuf,
        output: PathBuf,
        to: Option<String>,
    },
}

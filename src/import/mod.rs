mod batch;
mod channel;
mod collector;
mod csv;
mod decoder;
mod detect;
mod hooks;
mod json;
mod ndjson;
mod options;
mod pipeline;
mod progress;
mod schema;
mod source;
mod spreadsheet;
mod util;
mod xml;

pub use batch::BatchAccumulator;
pub use channel::{ImportHandle, spawn_import};
pub use collector::{ErrorCollector, ImportError};
pub use csv::CsvDecoder;
pub use decoder::{DecodeItem, RecordDecoder, decode_all};
pub use detect::{detect_format, format_from_content_type, format_from_name, sniff, sniff_delimiter};
pub use hooks::{
    FieldError, FnTransformer, PredicateValidator, RecordTransformer, RecordValidator, VALIDATION_FAILED,
    Validation,
};
pub use json::JsonDecoder;
pub use ndjson::NdjsonDecoder;
pub use options::{
    CsvOptions, DEFAULT_BATCH_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_INPUT_BYTES, ErrorCallback, ImportFormat,
    ImportOptions, JsonOptions, ProgressCallback, SpreadsheetOptions, XmlOptions,
};
pub use pipeline::{ImportRun, ImportSummary, RunState, import, import_bytes, import_file};
pub use progress::{ImportProgress, ProgressTracker};
pub use schema::{FieldKind, FieldRule, RecordSchema};
pub use source::ImportSource;
pub use spreadsheet::SpreadsheetDecoder;
pub use xml::XmlDecoder;

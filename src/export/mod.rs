mod options;
mod pipeline;
mod sinks;

pub use options::{CsvOptions, ExportFormat, ExportOptions, ExportReport};
pub use pipeline::{export_file, export_to_path, export_to_writer};
pub use sinks::{CsvSink, DocSink, JsonArraySink, NdjsonSink};

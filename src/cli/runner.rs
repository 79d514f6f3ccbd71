use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::errors::PipelineError;
use crate::export::{ExportOptions, export_to_writer};
use crate::import::{ImportOptions, ImportSummary, detect_format, import_file};

use super::command::Command;
use super::util::resolve_export_format;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

/// Run a command with human-readable output on stdout.
///
/// # Errors
/// See [`run_with_format`].
pub fn run(cmd: Command, opts: ImportOptions) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    run_with_format(cmd, opts, OutputMode::Human, &mut stdout.lock())
}

/// # Errors
/// Returns the run's fatal error after its summary was printed, or I/O
/// errors writing to `out`.
pub fn run_with_format(
    cmd: Command,
    opts: ImportOptions,
    mode: OutputMode,
    out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Import { file, emit_records } => {
            let mut run = import_file(&file, opts);
            let mut failure = None;
            for batch in run.by_ref() {
                match batch {
                    Ok(batch) if emit_records => {
                        for rec in &batch.records {
                            writeln!(out, "{}", serde_json::to_string(rec)?)?;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => failure = Some(e),
                }
            }
            let summary = run.finish();
            // With --records, stdout carries data; the summary goes to stderr.
            if emit_records {
                print_summary(&summary, mode, &mut std::io::stderr())?;
            } else {
                print_summary(&summary, mode, out)?;
            }
            match failure {
                Some(e) => Err(Box::new(e)),
                None => Ok(()),
            }
        }
        Command::Detect { file } => {
            let name = file.file_name().map(|n| n.to_string_lossy().into_owned());
            let mut reader = BufReader::new(File::open(&file)?);
            let format = detect_format(&mut reader, name.as_deref(), None)?;
            match (format, mode) {
                (Some(f), OutputMode::Json) => {
                    writeln!(out, "{}", serde_json::json!({"file": file.display().to_string(), "format": f}))?;
                }
                (Some(f), _) => writeln!(out, "{f}")?,
                (None, _) => {
                    return Err(Box::new(PipelineError::UnsupportedFormat(format!(
                        "cannot detect the format of {}",
                        file.display()
                    ))));
                }
            }
            Ok(())
        }
        Command::Convert { input, output, to } => {
            let eopts = ExportOptions { format: resolve_export_format(to.as_deref(), &output)?, ..Default::default() };
            let (summary, written) = convert(&input, &output, opts, &eopts)?;
            match mode {
                OutputMode::Json => writeln!(
                    out,
                    "{}",
                    serde_json::json!({"output": output.display().to_string(), "written": written, "summary": summary})
                )?,
                OutputMode::Plain => writeln!(out, "written={written} rejected={}", summary.records_rejected)?,
                OutputMode::Human => {
                    writeln!(out, "{}", summary.outcome())?;
                    writeln!(out, "wrote {written} records to {}", output.display())?;
                }
            }
            Ok(())
        }
    }
}

/// Import `input` and export the accepted records to `output`. The output is
/// only replaced when the import completes.
fn convert(
    input: &Path,
    output: &Path,
    opts: ImportOptions,
    eopts: &ExportOptions,
) -> Result<(ImportSummary, u64), Box<dyn std::error::Error>> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent)?;
    let mut run = import_file(input, opts);
    let mut failure: Option<PipelineError> = None;
    let records = run
        .by_ref()
        .map_while(|b| match b {
            Ok(b) => Some(b),
            Err(e) => {
                failure = Some(e);
                None
            }
        })
        .flatten();
    let report = export_to_writer(records, &mut tmp, eopts)?;
    if let Some(e) = failure {
        return Err(Box::new(e));
    }
    let summary = run.finish();
    tmp.persist(output)?;
    log::info!("convert: {} -> {} ({} records)", input.display(), output.display(), report.written);
    Ok((summary, report.written))
}

fn print_summary(summary: &ImportSummary, mode: OutputMode, out: &mut dyn Write) -> std::io::Result<()> {
    match mode {
        OutputMode::Json => writeln!(out, "{}", serde_json::to_string(summary)?),
        OutputMode::Plain => writeln!(
            out,
            "state={:?} format={} imported={} rejected={} batches={}",
            summary.state, summary.format, summary.records_imported, summary.records_rejected, summary.batches
        ),
        OutputMode::Human => {
            writeln!(out, "{}", summary.outcome())?;
            for e in summary.errors.iter().take(20) {
                writeln!(out, "  {e}")?;
            }
            if summary.errors.len() > 20 {
                writeln!(out, "  ... {} more", summary.errors.len() - 20)?;
            }
            Ok(())
        }
    }
}

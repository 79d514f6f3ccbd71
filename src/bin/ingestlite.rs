use clap::{Args, Parser, Subcommand};
use ingestlite::cli::{self as prog_cli, OutputMode};
use ingestlite::config::AppConfig;
use ingestlite::utils::logger;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ingestlite", version, about = "Streaming CSV/JSON/NDJSON/XML/spreadsheet importer", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long, global = true, help = "Path to a config file (TOML). If omitted, default locations are searched.")]
    config: Option<PathBuf>,
    #[arg(long, global = true, conflicts_with = "plain", help = "Machine-readable JSON output")]
    json: bool,
    #[arg(long, global = true, help = "Terse key=value output")]
    plain: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct ImportArgs {
    #[arg(long, help = "Format override: csv|json|ndjson|xml|spreadsheet; defaults to auto-detect")]
    format: Option<String>,
    #[arg(long, help = "Records per batch (default 100)")]
    batch_size: Option<usize>,
    #[arg(long, help = "Progress chunk size in bytes (default 1 MiB)")]
    chunk_size: Option<usize>,
    #[arg(long, help = "Reject inputs larger than this many bytes (default 1 GiB)")]
    max_bytes: Option<u64>,
    #[arg(long, help = "Validate records against a TOML schema file")]
    schema: Option<PathBuf>,
    #[arg(long, help = "Location of the records: dot path for JSON (out.list), slash path for XML (doc/list/e)")]
    record_path: Option<String>,
    #[arg(long, help = "Worksheet to read; defaults to the first sheet")]
    sheet: Option<String>,
    #[arg(long, help = "CSV delimiter: a single character or 'tab'")]
    delimiter: Option<String>,
    #[arg(long, help = "Treat the first CSV row as data")]
    no_headers: bool,
    #[arg(long, help = "Keep CSV/XML values as strings")]
    no_infer: bool,
}

impl ImportArgs {
    fn into_config(self) -> AppConfig {
        AppConfig {
            format: self.format,
            chunk_size: self.chunk_size,
            batch_size: self.batch_size,
            max_input_bytes: self.max_bytes,
            delimiter: self.delimiter,
            has_headers: self.no_headers.then_some(false),
            type_infer: self.no_infer.then_some(false),
            record_path: self.record_path,
            sheet: self.sheet,
            schema: self.schema,
            ..AppConfig::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Import a file and print a summary of accepted and rejected records")]
    Import {
        #[arg(help = "Path to input file")]
        file: PathBuf,
        #[arg(long, help = "Stream accepted records to stdout as NDJSON; the summary goes to stderr")]
        records: bool,
        #[command(flatten)]
        args: ImportArgs,
    },
    #[command(about = "Print the detected format of a file")]
    Detect {
        #[arg(help = "Path to input file")]
        file: PathBuf,
    },
    #[command(about = "Import a file and write its accepted records as CSV/JSON/NDJSON")]
    Convert {
        #[arg(help = "Path to input file")]
        input: PathBuf,
        #[arg(help = "Path to output file; replaced only when the import succeeds")]
        output: PathBuf,
        #[arg(long, help = "Output format: csv|json|ndjson; defaults to the output extension")]
        to: Option<String>,
        #[command(flatten)]
        args: ImportArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    let mode = if cli.json {
        OutputMode::Json
    } else if cli.plain {
        OutputMode::Plain
    } else {
        OutputMode::Human
    };
    let (cmd, args) = match cli.command {
        Commands::Import { file, records, args } => (prog_cli::Command::Import { file, emit_records: records }, args),
        Commands::Detect { file } => (prog_cli::Command::Detect { file }, ImportArgs::default()),
        Commands::Convert { input, output, to, args } => (prog_cli::Command::Convert { input, output, to }, args),
    };
    // Precedence: CLI > env > config files > defaults
    let cfg = match AppConfig::load(cli.config.as_deref()) {
        Ok(loaded) => args.into_config().or(loaded),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    if let Some(s) = cfg.log_settings()
        && let Err(e) =
            logger::configure_logging_with_dev(s.dir.as_deref(), s.level.as_deref(), s.retention, s.dev6)
    {
        eprintln!("warning: logging disabled: {e}");
    }
    let opts = match cfg.to_import_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    let stdout = std::io::stdout();
    if let Err(e) = prog_cli::run_with_format(cmd, opts, mode, &mut stdout.lock()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

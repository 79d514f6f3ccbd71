//! Layered configuration: CLI > environment (`INGESTLITE_*`) > config files > defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, PipelineError};
use crate::import::{ImportFormat, ImportOptions, RecordSchema};
use crate::utils::logger::LogSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub format: Option<String>,
    pub chunk_size: Option<usize>,
    pub batch_size: Option<usize>,
    pub max_input_bytes: Option<u64>,
    /// A single character, or `tab`.
    pub delimiter: Option<String>,
    pub has_headers: Option<bool>,
    pub type_infer: Option<bool>,
    pub record_path: Option<String>,
    pub sheet: Option<String>,
    pub schema: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_retention: Option<usize>,
    /// Also write the state transition trace to `dev6.log`.
    pub dev6: Option<bool>,
}

impl AppConfig {
    /// # Errors
    /// `Toml` when `s` is not a valid config document.
    pub fn from_toml_str(s: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|source| ConfigError::Toml { path: origin.to_string(), source })
    }

    /// # Errors
    /// `Read` or `Toml` for unreadable or invalid files.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        Self::from_toml_str(&s, &path.display().to_string())
    }

    /// Build a config from environment-style lookups.
    ///
    /// # Errors
    /// `InvalidValue` when a numeric or boolean variable does not parse.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            format: get("INGESTLITE_FORMAT"),
            chunk_size: parse_var(&get, "INGESTLITE_CHUNK_SIZE")?,
            batch_size: parse_var(&get, "INGESTLITE_BATCH_SIZE")?,
            max_input_bytes: parse_var(&get, "INGESTLITE_MAX_INPUT_BYTES")?,
            delimiter: get("INGESTLITE_DELIMITER"),
            has_headers: parse_flag(&get, "INGESTLITE_HAS_HEADERS")?,
            type_infer: parse_flag(&get, "INGESTLITE_TYPE_INFER")?,
            record_path: get("INGESTLITE_RECORD_PATH"),
            sheet: get("INGESTLITE_SHEET"),
            schema: get("INGESTLITE_SCHEMA").map(PathBuf::from),
            log_dir: get("INGESTLITE_LOG_DIR").map(PathBuf::from),
            log_level: get("INGESTLITE_LOG_LEVEL"),
            log_retention: parse_var(&get, "INGESTLITE_LOG_RETENTION")?,
            dev6: parse_flag(&get, "INGESTLITE_DEV6")?,
        })
    }

    /// # Errors
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Fill every unset field of `self` from `lower`.
    #[must_use]
    pub fn or(self, lower: Self) -> Self {
        Self {
            format: self.format.or(lower.format),
            chunk_size: self.chunk_size.or(lower.chunk_size),
            batch_size: self.batch_size.or(lower.batch_size),
            max_input_bytes: self.max_input_bytes.or(lower.max_input_bytes),
            delimiter: self.delimiter.or(lower.delimiter),
            has_headers: self.has_headers.or(lower.has_headers),
            type_infer: self.type_infer.or(lower.type_infer),
            record_path: self.record_path.or(lower.record_path),
            sheet: self.sheet.or(lower.sheet),
            schema: self.schema.or(lower.schema),
            log_dir: self.log_dir.or(lower.log_dir),
            log_level: self.log_level.or(lower.log_level),
            log_retention: self.log_retention.or(lower.log_retention),
            dev6: self.dev6.or(lower.dev6),
        }
    }

    /// Candidate config files in priority order.
    pub fn config_paths(cli_config: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(p) = cli_config {
            paths.push(p.to_path_buf());
        }
        if let Ok(p) = std::env::var("INGESTLITE_CONFIG") {
            paths.push(PathBuf::from(p));
        }
        if let Some(dir) = dirs_next::config_dir() {
            paths.push(dir.join("ingestlite.toml"));
        }
        if let Ok(cur) = std::env::current_dir() {
            paths.push(cur.join("ingestlite.toml"));
        }
        paths
    }

    /// Merge the files in `paths` (earlier wins). A missing file is skipped,
    /// except `required`, which must exist.
    ///
    /// # Errors
    /// Propagates read and parse errors.
    pub fn from_files(paths: &[PathBuf], required: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        for p in paths {
            if !p.exists() && required != Some(p.as_path()) {
                continue;
            }
            log::debug!("loading config from {}", p.display());
            cfg = cfg.or(Self::from_file(p)?);
        }
        Ok(cfg)
    }

    /// Environment over files; CLI flags are layered on top by the caller.
    ///
    /// # Errors
    /// Propagates read, parse and environment errors.
    pub fn load(cli_config: Option<&Path>) -> Result<Self, ConfigError> {
        let files = Self::from_files(&Self::config_paths(cli_config), cli_config)?;
        Ok(Self::from_env()?.or(files))
    }

    /// File logging settings; `None` unless a log directory is configured.
    pub fn log_settings(&self) -> Option<LogSettings> {
        let dir = self.log_dir.clone()?;
        Some(LogSettings {
            dir: Some(dir),
            level: self.log_level.clone(),
            retention: self.log_retention,
            dev6: self.dev6.unwrap_or(false),
        })
    }

    /// # Errors
    /// `UnsupportedFormat` for an unknown format name, `Config` for a bad
    /// delimiter or schema file.
    pub fn to_import_options(&self) -> Result<ImportOptions, PipelineError> {
        let mut opts = ImportOptions::default();
        if let Some(f) = &self.format {
            opts.format = f.parse::<ImportFormat>()?;
        }
        if let Some(n) = self.chunk_size {
            opts.chunk_size = n;
        }
        if let Some(n) = self.batch_size {
            opts.batch_size = n;
        }
        if let Some(n) = self.max_input_bytes {
            opts.max_input_bytes = n;
        }
        if let Some(d) = &self.delimiter {
            opts.csv.delimiter = Some(parse_delimiter(d)?);
        }
        if let Some(h) = self.has_headers {
            opts.csv.has_headers = h;
        }
        if let Some(t) = self.type_infer {
            opts.csv.type_infer = t;
            opts.xml.type_infer = t;
        }
        if let Some(p) = &self.record_path {
            opts.json.record_path = Some(p.clone());
            opts.xml.record_path = Some(p.clone());
        }
        opts.spreadsheet.sheet = self.sheet.clone();
        if let Some(path) = &self.schema {
            opts = opts.with_validator(RecordSchema::from_file(path)?);
        }
        Ok(opts)
    }
}

fn parse_var<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: v }),
    }
}

fn parse_flag(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>, ConfigError> {
    match get(key) {
        None => Ok(None),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: v }),
        },
    }
}

/// `","`, `";"`, `"|"`, `"\t"` or the word `tab`.
///
/// # Errors
/// `InvalidValue` unless the input is a single ASCII character.
pub fn parse_delimiter(s: &str) -> Result<u8, ConfigError> {
    if s.eq_ignore_ascii_case("tab") || s == "\\t" {
        return Ok(b'\t');
    }
    match s.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(ConfigError::InvalidValue { key: "delimiter".into(), value: s.to_string() }),
    }
}

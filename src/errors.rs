use thiserror::Error;

use crate::import::ImportFormat;

/// Run-level failures. Any of these terminates an import run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Input of {size} bytes exceeds the size limit of {limit} bytes")]
    SizeLimitExceeded { size: u64, limit: u64 },

    #[error("{format} decode error: {message}")]
    Decode { format: ImportFormat, message: String },

    #[error("Transform failed at record {record_index}: {message}")]
    Transform { record_index: u64, message: String },

    #[error("Invalid import options: {0}")]
    InvalidOptions(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub(crate) fn decode(format: ImportFormat, message: impl Into<String>) -> Self {
        Self::Decode { format, message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("TOML parse error in {path}: {source}")]
    Toml { path: String, source: toml::de::Error },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

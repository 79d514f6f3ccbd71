//! Declarative record schema, adapted into a [`RecordValidator`].
//!
//! ```toml
//! [[fields]]
//! name = "age"
//! kind = "integer"
//! required = true
//! min = 0
//! ```

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::hooks::{FieldError, RecordValidator, Validation};
use crate::errors::ConfigError;
use crate::types::RawRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Any,
    String,
    Number,
    Integer,
    Boolean,
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, required: false, min: None, max: None }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    fn check(&self, value: Option<&Value>) -> Option<FieldError> {
        let value = match value {
            None | Some(Value::Null) => {
                return self.required.then(|| FieldError::new(&self.name, "is required"));
            }
            Some(Value::String(s)) if s.is_empty() => {
                return self.required.then(|| FieldError::new(&self.name, "is required"));
            }
            Some(v) => v,
        };
        let numeric = match self.kind {
            FieldKind::Any => None,
            FieldKind::String => {
                if !value.is_string() {
                    return Some(FieldError::new(&self.name, "expected a string"));
                }
                None
            }
            FieldKind::Number => match as_f64(value) {
                Some(n) => Some(n),
                None => return Some(FieldError::new(&self.name, "expected a number")),
            },
            FieldKind::Integer => match as_f64(value) {
                Some(n) if n.fract() == 0.0 => Some(n),
                _ => return Some(FieldError::new(&self.name, "expected an integer")),
            },
            FieldKind::Boolean => {
                let ok = match value {
                    Value::Bool(_) => true,
                    Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "false"),
                    _ => false,
                };
                if !ok {
                    return Some(FieldError::new(&self.name, "expected a boolean"));
                }
                None
            }
            FieldKind::Date => {
                if !value.as_str().is_some_and(is_date) {
                    return Some(FieldError::new(&self.name, "expected a date (YYYY-MM-DD)"));
                }
                None
            }
        };
        if let Some(n) = numeric {
            if let Some(min) = self.min
                && n < min
            {
                return Some(FieldError::new(&self.name, format!("value {n} is below minimum {min}")));
            }
            if let Some(max) = self.max
                && n > max
            {
                return Some(FieldError::new(&self.name, format!("value {n} exceeds maximum {max}")));
            }
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

impl RecordSchema {
    pub fn new(fields: Vec<FieldRule>) -> Self {
        Self { fields }
    }

    /// # Errors
    /// Returns `ConfigError::Toml` when the document does not describe a schema.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|source| ConfigError::Toml { path: "<inline>".into(), source })
    }

    /// # Errors
    /// Returns `ConfigError` when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let s = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: display.clone(), source })?;
        toml::from_str(&s).map_err(|source| ConfigError::Toml { path: display, source })
    }

    /// Field-level errors for `record`; empty when valid.
    pub fn check(&self, record: &RawRecord) -> Vec<FieldError> {
        let Some(obj) = record.as_object() else {
            return vec![FieldError::record_level("expected an object record")];
        };
        self.fields.iter().filter_map(|rule| rule.check(obj.get(&rule.name))).collect()
    }
}

impl RecordValidator for RecordSchema {
    fn validate(&self, record: &RawRecord) -> Validation {
        Validation::from_errors(self.check(record))
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
        || DateTime::parse_from_rfc3339(s).is_ok()
}

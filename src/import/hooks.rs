//! Caller-supplied validation and transformation hooks.

use serde::{Deserialize, Serialize};

use crate::types::RawRecord;

pub const VALIDATION_FAILED: &str = "Validation failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Option<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: Some(field.into()), message: message.into() }
    }

    pub fn record_level(message: impl Into<String>) -> Self {
        Self { field: None, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(Vec<FieldError>),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        if errors.is_empty() { Self::Valid } else { Self::Invalid(errors) }
    }
}

pub trait RecordValidator: Send + Sync {
    fn validate(&self, record: &RawRecord) -> Validation;
}

/// Transformers are expected to be total for valid input; an `Err` aborts
/// the run.
pub trait RecordTransformer: Send + Sync {
    fn transform(&self, record: RawRecord) -> Result<RawRecord, String>;
}

/// Adapts a boolean predicate into a [`RecordValidator`].
pub struct PredicateValidator<F> {
    predicate: F,
}

impl<F> PredicateValidator<F>
where
    F: Fn(&RawRecord) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> RecordValidator for PredicateValidator<F>
where
    F: Fn(&RawRecord) -> bool + Send + Sync,
{
    fn validate(&self, record: &RawRecord) -> Validation {
        if (self.predicate)(record) {
            Validation::Valid
        } else {
            Validation::Invalid(vec![FieldError::record_level(VALIDATION_FAILED)])
        }
    }
}

pub struct FnTransformer<F> {
    f: F,
}

impl<F> FnTransformer<F>
where
    F: Fn(RawRecord) -> Result<RawRecord, String> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> RecordTransformer for FnTransformer<F>
where
    F: Fn(RawRecord) -> Result<RawRecord, String> + Send + Sync,
{
    fn transform(&self, record: RawRecord) -> Result<RawRecord, String> {
        (self.f)(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn predicate_false_reports_generic_message() {
        let v = PredicateValidator::new(|r: &RawRecord| r.get("id").is_some());
        assert!(v.validate(&json!({"id": 1})).is_valid());
        match v.validate(&json!({})) {
            Validation::Invalid(errs) => {
                assert_eq!(errs.len(), 1);
                assert_eq!(errs[0].message, VALIDATION_FAILED);
                assert!(errs[0].field.is_none());
            }
            Validation::Valid => panic!("expected invalid"),
        }
    }

    #[test]
    fn fn_transformer_maps_records() {
        let t = FnTransformer::new(|mut r: RawRecord| {
            r["seen"] = json!(true);
            Ok(r)
        });
        assert_eq!(t.transform(json!({"a": 1})).unwrap(), json!({"a": 1, "seen": true}));
    }
}

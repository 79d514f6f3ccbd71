use serde_json::{Map, Number, Value};

/// Keys conventionally used to wrap a record collection, in lookup order.
pub const WRAPPER_KEYS: [&str; 5] = ["data", "items", "records", "rows", "entries"];

pub fn is_wrapper_key(key: &str) -> bool {
    WRAPPER_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Convert a text cell into a JSON value, inferring numbers and booleans
/// when `infer` is set. Empty cells become `null` under inference.
pub fn field_to_value(field: &str, infer: bool) -> Value {
    if !infer {
        return Value::String(field.to_string());
    }
    if field.is_empty() {
        return Value::Null;
    }
    if looks_numeric(field) {
        if let Ok(i) = field.parse::<i64>() {
            return Value::Number(i.into());
        }
        if let Ok(f) = field.parse::<f64>()
            && let Some(n) = Number::from_f64(f)
        {
            return Value::Number(n);
        }
    }
    match field.to_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(field.to_string()),
    }
}

// Rejects forms like "inf", "NaN", "1e", or zero-padded identifiers ("007")
// that f64/i64 parsing would otherwise accept or mangle.
fn looks_numeric(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let Some(first) = digits.chars().next() else {
        return false;
    };
    if !first.is_ascii_digit() {
        return false;
    }
    if digits.len() > 1 && first == '0' && digits.as_bytes()[1].is_ascii_digit() {
        return false;
    }
    digits.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
}

/// Locate the record collection inside a parsed document.
///
/// With an explicit dot-separated `path` the value at that path is used.
/// Otherwise a top-level array is the collection, an object wrapping an array
/// under one of [`WRAPPER_KEYS`] yields that array, and anything else is a
/// single record.
pub fn unwrap_records(doc: Value, path: Option<&str>) -> Result<Vec<Value>, String> {
    if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
        let mut cur = doc;
        for seg in path.split('.').filter(|s| !s.is_empty()) {
            cur = match cur {
                Value::Object(mut map) => {
                    map.remove(seg).ok_or_else(|| format!("record path segment '{seg}' not found"))?
                }
                Value::Array(mut arr) => {
                    let idx: usize = seg
                        .parse()
                        .map_err(|_| format!("record path segment '{seg}' is not an index"))?;
                    if idx >= arr.len() {
                        return Err(format!("record path index {idx} out of bounds"));
                    }
                    arr.swap_remove(idx)
                }
                _ => return Err(format!("record path segment '{seg}' does not address a container")),
            };
        }
        return Ok(match cur {
            Value::Array(arr) => arr,
            other => vec![other],
        });
    }
    match doc {
        Value::Array(arr) => Ok(arr),
        Value::Object(mut map) => {
            let key = WRAPPER_KEYS
                .iter()
                .find(|k| map.get(**k).is_some_and(Value::is_array))
                .map(|k| (*k).to_string());
            match key.and_then(|k| map.remove(&k)) {
                Some(Value::Array(arr)) => Ok(arr),
                _ => Ok(vec![Value::Object(map)]),
            }
        }
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

/// Insert `value` under `key`, turning repeated keys into arrays.
pub fn insert_repeated(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(existing)) => existing.push(value),
        Some(existing) => {
            let prev = existing.take();
            *existing = Value::Array(vec![prev, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

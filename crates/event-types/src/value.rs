//! Runtime values produced by field and literal resolution.
//!
//! Event payloads are open JSON, but some paths resolve to instants
//! (`startTime`, `created`, `now`) and some resolve to nothing at all.
//! [`FieldValue`] keeps those three cases apart so comparisons can treat an
//! instant as epoch milliseconds and a missing field as distinct from `null`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// A resolved value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// The path did not lead anywhere.
    #[default]
    Undefined,
    Json(Value),
    Instant(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, FieldValue::Undefined)
    }

    /// `true` for `Undefined` and JSON `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, FieldValue::Undefined | FieldValue::Json(Value::Null))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            FieldValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Value::as_str)
    }

    /// Numeric coercion. Returns `None` where a loose numeric conversion
    /// would produce NaN.
    ///
    /// Numbers pass through, booleans become 0/1, `null` and blank strings
    /// become 0, numeric strings parse, instants become epoch milliseconds.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            FieldValue::Undefined => None,
            FieldValue::Instant(t) => Some(t.timestamp_millis() as f64),
            FieldValue::Json(v) => match v {
                Value::Null => Some(0.0),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                Value::Number(n) => n.as_f64(),
                Value::String(s) => {
                    let trimmed = s.trim();
                    if trimmed.is_empty() {
                        Some(0.0)
                    } else {
                        trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
                    }
                }
                Value::Array(_) | Value::Object(_) => None,
            },
        }
    }

    /// Truthiness used when a bare field reference is a condition.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Undefined => false,
            FieldValue::Instant(_) => true,
            FieldValue::Json(v) => match v {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
                Value::String(s) => !s.is_empty(),
                Value::Array(_) | Value::Object(_) => true,
            },
        }
    }

    /// Convert back into plain JSON. Instants become RFC 3339 strings and
    /// `Undefined` becomes `null`.
    pub fn into_json(self) -> Value {
        match self {
            FieldValue::Undefined => Value::Null,
            FieldValue::Json(v) => v,
            FieldValue::Instant(t) => Value::String(format_instant(&t)),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Json(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Instant(t)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Json(Value::from(n))
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_instant(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format a number the way it reads in a message: `10`, not `10.0`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Human-readable form of a JSON value for error messages: strings unquoted,
/// numbers without a trailing `.0`.
pub fn display_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

//! Literal normalization and value comparison.

use chrono::NaiveDate;
use serde_json::Value;

use crate::ast::{ComparisonOperator, Literal};
use crate::value::FieldValue;

const MINUTES_PER_HOUR: f64 = 60.0;
const MINUTES_PER_DAY: f64 = 1440.0;
const MINUTES_PER_WEEK: f64 = 10080.0;

/// Minutes per unit. Unknown units count as minutes.
pub fn unit_multiplier(unit: &str) -> f64 {
    match unit {
        "minutes" => 1.0,
        "hours" => MINUTES_PER_HOUR,
        "days" => MINUTES_PER_DAY,
        "weeks" => MINUTES_PER_WEEK,
        _ => 1.0,
    }
}

pub fn duration_in_minutes(value: f64, unit: &str) -> f64 {
    value * unit_multiplier(unit)
}

/// Resolve a literal to a runtime value. Durations become minutes.
pub fn get_literal_value(literal: &Literal) -> FieldValue {
    match literal {
        Literal::Duration(d) => FieldValue::from(duration_in_minutes(d.value, &d.unit)),
        Literal::Value(v) => FieldValue::Json(v.clone()),
    }
}

/// Compare two runtime values.
///
/// Strings that are both strict `YYYY-MM-DD` dates compare as dates; strings
/// that are both clock times (`H:mm`, `HH:mm`, `HH:mm:ss`) compare as minutes
/// since midnight.
/// Otherwise instants compare as epoch milliseconds. Equality is strict (no
/// cross-type coercion); ordering is numeric. Unknown operators yield `false`.
pub fn compare_values(left: &FieldValue, right: &FieldValue, operator: &ComparisonOperator) -> bool {
    let (left, right) = normalize_pair(left, right);

    match operator {
        ComparisonOperator::Is | ComparisonOperator::Equals => strict_equals(&left, &right),
        ComparisonOperator::IsNot | ComparisonOperator::NotEquals => !strict_equals(&left, &right),
        ComparisonOperator::GreaterThan => numeric(&left, &right, |l, r| l > r),
        ComparisonOperator::GreaterThanOrEqual => numeric(&left, &right, |l, r| l >= r),
        ComparisonOperator::LessThan => numeric(&left, &right, |l, r| l < r),
        ComparisonOperator::LessThanOrEqual => numeric(&left, &right, |l, r| l <= r),
        ComparisonOperator::Unknown(_) => false,
    }
}

/// Bring both sides to a common representation before comparing.
fn normalize_pair(left: &FieldValue, right: &FieldValue) -> (FieldValue, FieldValue) {
    if let (Some(l), Some(r)) = (left.as_str(), right.as_str()) {
        if let (Some(l), Some(r)) = (parse_date(l), parse_date(r)) {
            return (FieldValue::from(l), FieldValue::from(r));
        }
        if let (Some(l), Some(r)) = (parse_time(l), parse_time(r)) {
            return (FieldValue::from(l), FieldValue::from(r));
        }
    }
    (instant_to_millis(left), instant_to_millis(right))
}

fn instant_to_millis(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::Instant(t) => FieldValue::Json(Value::from(t.timestamp_millis())),
        other => other.clone(),
    }
}

fn strict_equals(left: &FieldValue, right: &FieldValue) -> bool {
    match (left, right) {
        (FieldValue::Undefined, FieldValue::Undefined) => true,
        (FieldValue::Json(Value::Number(l)), FieldValue::Json(Value::Number(r))) => {
            match (l.as_f64(), r.as_f64()) {
                (Some(l), Some(r)) => l == r,
                _ => l == r,
            }
        }
        (FieldValue::Json(l), FieldValue::Json(r)) => l == r,
        _ => false,
    }
}

fn numeric(left: &FieldValue, right: &FieldValue, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (left.to_number(), right.to_number()) {
        (Some(l), Some(r)) => cmp(l, r),
        _ => false,
    }
}

/// Strict `YYYY-MM-DD`, as epoch milliseconds at UTC midnight.
///
/// The string must round-trip: `2024-02-30` and `2024-2-1` are rejected.
pub fn parse_date(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    if date.format("%Y-%m-%d").to_string() != s {
        return None;
    }
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(midnight.timestamp_millis() as f64)
}

/// `H:mm`, `HH:mm` or `HH:mm:ss`, as minutes since midnight. Hours take one
/// or two digits; minutes and seconds take exactly two. Fields are range-checked.
pub fn parse_time(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let field = |part: &str, digits: std::ops::RangeInclusive<usize>, max: u32| -> Option<u32> {
        if !digits.contains(&part.len()) || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse::<u32>().ok().filter(|v| *v <= max)
    };
    let hours = field(parts[0], 1..=2, 23)?;
    let minutes = field(parts[1], 2..=2, 59)?;
    let seconds = match parts.get(2) {
        Some(part) => field(part, 2..=2, 59)?,
        None => 0,
    };
    Some(f64::from(hours * 60 + minutes) + f64::from(seconds) / 60.0)
}

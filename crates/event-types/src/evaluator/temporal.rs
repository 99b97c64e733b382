//! Base temporal invariants driven by named constraints.
//!
//! These run on every `validate` call, independent of the declared rule tree.
//!
//! | Constraint | Check |
//! |---|---|
//! | (always) | `startTime < endTime` |
//! | `minDuration` / `maxDuration` | event duration in minutes within bounds |
//! | `timePrecision` | UTC minute of start and end divisible by the precision |
//! | `minAdvanceTime` / `maxAdvanceTime` | start within `[now + min, now + max]` (needs `now`) |
//! | `timeZone` / `allowedTimeZones` | event time zone matches / is allowed |
//! | (`allDay`) | all-day start/end formatting |
//! | `allowCrossDay: false` | start and end share a UTC date |
//! | `maxCrossDayDuration` | whole UTC days spanned within limit |

use chrono::{DateTime, Timelike, Utc};
use serde_json::Value;

use crate::ast::{ConstraintRule, ConstraintValue};
use crate::evaluator::compare::duration_in_minutes;
use crate::evaluator::coerce_number;
use crate::evaluator::fields::duration_minutes;
use crate::event::{Event, ValidationContext};
use crate::recurrence::check_template;
use crate::value::format_number;

/// Collect every base-invariant violation for `event`.
pub fn check_invariants(
    constraints: &[ConstraintRule],
    event: &Event,
    ctx: &ValidationContext<'_>,
) -> Vec<String> {
    let mut errors = Vec::new();
    let find = |name: &str| find_constraint(constraints, name);

    if event.start_time >= event.end_time {
        errors.push("Start time must be before end time".to_string());
    }

    check_duration(
        find("minDuration").and_then(as_minutes),
        find("maxDuration").and_then(as_minutes),
        event,
        &mut errors,
    );

    if let Some(precision) = find("timePrecision").and_then(as_minutes) {
        check_precision(precision, event, &mut errors);
    }

    if let Some(now) = ctx.now {
        check_advance(
            find("minAdvanceTime").and_then(as_minutes),
            find("maxAdvanceTime").and_then(as_minutes),
            now,
            event,
            &mut errors,
        );
    }

    if let (Some(required), Some(actual)) = (
        find("timeZone").and_then(as_str),
        event.time_zone.as_deref(),
    ) {
        if required != actual {
            errors.push(format!(
                "Event time zone {} does not match required time zone {}",
                actual, required
            ));
        }
    }

    if let (Some(ConstraintValue::Literal(Value::Array(allowed))), Some(actual)) =
        (find("allowedTimeZones"), event.time_zone.as_deref())
    {
        if !allowed.iter().any(|tz| tz.as_str() == Some(actual)) {
            errors.push(format!("Time zone {} is not allowed", actual));
        }
    }

    if event.all_day == Some(true) {
        check_all_day(event, &mut errors);
    } else if matches!(
        find("allowCrossDay"),
        Some(ConstraintValue::Literal(Value::Bool(false)))
    ) && event.start_time.date_naive() != event.end_time.date_naive()
    {
        errors.push("Event cannot span multiple days".to_string());
    }

    if let Some(max_days) = find("maxCrossDayDuration").and_then(as_days) {
        let span = (event.end_time.date_naive() - event.start_time.date_naive()).num_days();
        if span as f64 > max_days {
            errors.push(format!(
                "Event spans {} days, exceeding the maximum of {} days",
                span,
                format_number(max_days)
            ));
        }
    }

    if let Some(recurring) = &event.recurring {
        errors.extend(check_template(recurring));
    }

    errors
}

fn check_duration(min: Option<f64>, max: Option<f64>, event: &Event, errors: &mut Vec<String>) {
    if min.is_none() && max.is_none() {
        return;
    }
    let Some(duration) = coerce_number(&duration_minutes(event)) else {
        errors.push("Event duration cannot be compared numerically".to_string());
        return;
    };
    if let Some(min) = min {
        if duration < min {
            errors.push(format!(
                "Event duration ({} minutes) is shorter than the minimum of {} minutes",
                format_number(duration),
                format_number(min)
            ));
        }
    }
    if let Some(max) = max {
        if duration > max {
            errors.push(format!(
                "Event duration ({} minutes) exceeds the maximum of {} minutes",
                format_number(duration),
                format_number(max)
            ));
        }
    }
}

fn check_precision(precision: f64, event: &Event, errors: &mut Vec<String>) {
    if precision.is_nan() || precision <= 0.0 {
        errors.push(format!(
            "Time precision must be a positive number of minutes, got {}",
            format_number(precision)
        ));
        return;
    }
    for (label, instant) in [("Start", event.start_time), ("End", event.end_time)] {
        if f64::from(instant.minute()) % precision != 0.0 {
            errors.push(format!(
                "{} time must align to {}-minute intervals",
                label,
                format_number(precision)
            ));
        }
    }
}

fn check_advance(
    min: Option<f64>,
    max: Option<f64>,
    now: DateTime<Utc>,
    event: &Event,
    errors: &mut Vec<String>,
) {
    // Compared as lead time so bounds past chrono's range cannot overflow.
    let lead_ms = event.start_time.signed_duration_since(now).num_milliseconds() as f64;
    if let Some(min) = min {
        if lead_ms < to_millis(min) {
            errors.push(format!(
                "Event must be scheduled at least {} minutes in advance",
                format_number(min)
            ));
        }
    }
    if let Some(max) = max {
        if lead_ms > to_millis(max) {
            errors.push(format!(
                "Event cannot be scheduled more than {} minutes in advance",
                format_number(max)
            ));
        }
    }
}

/// All-day events start at UTC midnight and end either at 23:59:59 the same
/// day or at midnight the next day.
fn check_all_day(event: &Event, errors: &mut Vec<String>) {
    let start = event.start_time;
    let end = event.end_time;

    if !is_midnight(start) {
        errors.push("All-day events must start at 00:00:00.000 UTC".to_string());
    }

    let same_day_close = end.date_naive() == start.date_naive()
        && end.hour() == 23
        && end.minute() == 59
        && end.second() == 59;
    let next_midnight = start.date_naive().succ_opt() == Some(end.date_naive())
        && is_midnight(end);

    if !same_day_close && !next_midnight {
        errors.push(
            "All-day events must end at 23:59:59 UTC the same day or 00:00:00.000 UTC the next day"
                .to_string(),
        );
    }
}

fn is_midnight(t: DateTime<Utc>) -> bool {
    t.num_seconds_from_midnight() == 0 && t.nanosecond() == 0
}

fn find_constraint<'a>(constraints: &'a [ConstraintRule], name: &str) -> Option<&'a ConstraintValue> {
    constraints.iter().find(|c| c.name == name).map(|c| &c.value)
}

fn to_millis(minutes: f64) -> f64 {
    (minutes * 60_000.0).round()
}

fn as_minutes(value: &ConstraintValue) -> Option<f64> {
    match value {
        ConstraintValue::Duration(d) => Some(duration_in_minutes(d.value, &d.unit)),
        ConstraintValue::Literal(v) => v.as_f64(),
        ConstraintValue::Range { .. } => None,
    }
}

/// Day limit: durations convert through minutes, bare numbers are days.
fn as_days(value: &ConstraintValue) -> Option<f64> {
    match value {
        ConstraintValue::Duration(d) => Some(duration_in_minutes(d.value, &d.unit) / 1440.0),
        ConstraintValue::Literal(v) => v.as_f64(),
        ConstraintValue::Range { .. } => None,
    }
}

fn as_str(value: &ConstraintValue) -> Option<&str> {
    match value {
        ConstraintValue::Literal(Value::String(s)) => Some(s),
        _ => None,
    }
}

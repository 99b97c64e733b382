//! Field-path resolution against an event, its `extra` payload, and the
//! acting user.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::{Map, Value};

use crate::event::{Event, ValidationContext};
use crate::value::FieldValue;

/// Resolve a dotted field path.
///
/// Precedence, first match wins:
///
/// 1. `user.*` with a user in context: null-safe walk into the user.
/// 2. `startTime` / `endTime`, optionally with one derived UTC property.
/// 3. `title`, `type`, `id`.
/// 4. `duration`: `extra.duration` if set, else whole minutes between start and end.
/// 5. `now`: the context instant, or the wall clock.
/// 6. `created`: `metadata.createdAt`.
/// 7. `extra.*`: walk the payload.
/// 8. Any other multi-segment path walks the payload from the first segment.
/// 9. Any other single segment is a payload key.
///
/// While walking the payload, a `count` segment applied to an array yields
/// the array's length.
pub fn get_field_value(path: &[String], event: &Event, ctx: &ValidationContext<'_>) -> FieldValue {
    let Some(head) = path.first() else {
        return FieldValue::Undefined;
    };
    let rest = &path[1..];

    if head == "user" {
        if let Some(user) = ctx.user {
            return walk_value(user, rest);
        }
    }

    match head.as_str() {
        "startTime" => return instant_field(event.start_time, rest, event),
        "endTime" => return instant_field(event.end_time, rest, event),
        _ => {}
    }

    if rest.is_empty() {
        match head.as_str() {
            "title" => return optional_string(event.title.as_deref()),
            "type" => return FieldValue::Json(Value::String(event.event_type.clone())),
            "id" => return FieldValue::Json(Value::String(event.id.clone())),
            "duration" => return duration_minutes(event),
            "now" => return FieldValue::Instant(ctx.now.unwrap_or_else(Utc::now)),
            "created" => {
                return event
                    .metadata
                    .as_ref()
                    .and_then(|m| m.created_at)
                    .map_or(FieldValue::Undefined, FieldValue::Instant)
            }
            _ => {}
        }
    }

    if head == "extra" {
        return walk_map(&event.extra, rest);
    }

    walk_map(&event.extra, path)
}

/// Length of the event in minutes, unless the payload overrides it.
pub fn duration_minutes(event: &Event) -> FieldValue {
    match event.extra.get("duration") {
        Some(v) if !v.is_null() => FieldValue::Json(v.clone()),
        _ => {
            let millis = (event.end_time - event.start_time).num_milliseconds() as f64;
            FieldValue::from((millis / 60_000.0).round())
        }
    }
}

fn instant_field(instant: DateTime<Utc>, rest: &[String], event: &Event) -> FieldValue {
    match rest {
        [] => FieldValue::Instant(instant),
        [property] => derived_property(instant, property, event),
        _ => FieldValue::Undefined,
    }
}

fn derived_property(instant: DateTime<Utc>, property: &str, event: &Event) -> FieldValue {
    let number = |n: u32| FieldValue::Json(Value::from(n));
    match property {
        "hour" => number(instant.hour()),
        "minute" => number(instant.minute()),
        "second" => number(instant.second()),
        "day" => number(instant.day()),
        "month" => number(instant.month()),
        "year" => FieldValue::Json(Value::from(instant.year())),
        "date" => FieldValue::Json(Value::String(instant.format("%Y-%m-%d").to_string())),
        "dayOfWeek" => number(instant.weekday().num_days_from_sunday()),
        "timeZone" => optional_string(
            event
                .time_zone
                .as_deref()
                .or_else(|| event.recurring.as_ref().and_then(|r| r.time_zone.as_deref())),
        ),
        _ => FieldValue::Undefined,
    }
}

fn optional_string(s: Option<&str>) -> FieldValue {
    s.map_or(FieldValue::Undefined, |s| {
        FieldValue::Json(Value::String(s.to_string()))
    })
}

fn walk_map(map: &Map<String, Value>, path: &[String]) -> FieldValue {
    let Some((first, rest)) = path.split_first() else {
        return FieldValue::Json(Value::Object(map.clone()));
    };
    match map.get(first) {
        Some(value) => walk_value(value, rest),
        None => FieldValue::Undefined,
    }
}

/// Null-safe walk through nested JSON.
fn walk_value(root: &Value, path: &[String]) -> FieldValue {
    let mut current = root;
    for (i, segment) in path.iter().enumerate() {
        current = match current {
            Value::Array(items) if segment == "count" => {
                let len = FieldValue::Json(Value::from(items.len()));
                return if i + 1 == path.len() {
                    len
                } else {
                    FieldValue::Undefined
                };
            }
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(item) => item,
                None => return FieldValue::Undefined,
            },
            Value::Object(map) => match map.get(segment) {
                Some(value) => value,
                None => return FieldValue::Undefined,
            },
            _ => return FieldValue::Undefined,
        };
    }
    FieldValue::Json(current.clone())
}

//! Recurrence descriptors: structural checks and occurrence expansion.
//!
//! [`check_template`] enforces the descriptor invariants at validate time.
//! [`expand_occurrences`] turns a recurring event into concrete instances by
//! lowering its descriptor to an RFC 5545 RRULE and expanding it with the
//! `rrule` crate. Wall-clock times are anchored in the recurrence's time zone
//! (`chrono-tz`), so instances keep their local hour across DST transitions.

use chrono::{DateTime, Utc};
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{Frequency, RecurrenceTemplate};
use crate::error::{EventTypeError, Result};
use crate::event::Event;

/// Upper bound on instances produced when the caller gives no limit.
pub const DEFAULT_EXPANSION_LIMIT: u16 = 500;

const WEEKDAYS: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];

/// A single concrete instance of a (possibly recurring) event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Structural violations of a recurrence descriptor, one message each.
pub fn check_template(template: &RecurrenceTemplate) -> Vec<String> {
    let mut errors = Vec::new();

    match (template.end_date, template.count) {
        (Some(_), Some(_)) => errors.push(
            "Recurring events must specify either an end date or a count, not both".to_string(),
        ),
        (None, None) => {
            errors.push("Recurring events must specify an end date or a count".to_string())
        }
        _ => {}
    }

    if template.interval <= 0 {
        errors.push("Recurrence interval must be greater than 0".to_string());
    }

    if matches!(template.count, Some(c) if c <= 0) {
        errors.push("Recurrence count must be greater than 0".to_string());
    }

    match template.frequency {
        Frequency::Weekly => match template.days_of_week.as_deref() {
            None | Some([]) => errors
                .push("Weekly recurrence requires at least one day of the week".to_string()),
            Some(days) if days.iter().any(|d| !(0..=6).contains(d)) => errors.push(
                "Days of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ),
            Some(_) => {}
        },
        Frequency::Monthly => {
            if !matches!(template.day_of_month, Some(d) if (1..=31).contains(&d)) {
                errors.push(
                    "Monthly recurrence requires a day of month between 1 and 31".to_string(),
                );
            }
        }
        Frequency::Daily | Frequency::Yearly => {}
    }

    if let Some(tz) = &template.time_zone {
        if tz.parse::<chrono_tz::Tz>().is_err() {
            errors.push(format!("Unknown recurrence time zone: {}", tz));
        }
    }

    errors
}

/// Expand an event into its concrete occurrences.
///
/// A non-recurring event expands to itself. Each instance keeps the event's
/// duration. The time zone resolves from the recurrence, then the event, then
/// UTC. At most `limit` instances are produced (default
/// [`DEFAULT_EXPANSION_LIMIT`]).
///
/// # Errors
/// Returns `EventTypeError::InvalidRecurrence` if the descriptor fails
/// [`check_template`], and `EventTypeError::Expansion` if `rrule` rejects the
/// generated rule set.
/// Returns `EventTypeError::InvalidTimezone` if the event's time zone is not a
/// valid IANA identifier.
pub fn expand_occurrences(event: &Event, limit: Option<u16>) -> Result<Vec<Occurrence>> {
    let Some(template) = &event.recurring else {
        return Ok(vec![Occurrence {
            start: event.start_time,
            end: event.end_time,
        }]);
    };

    let problems = check_template(template);
    if !problems.is_empty() {
        return Err(EventTypeError::InvalidRecurrence(problems.join("; ")));
    }

    let timezone = template
        .time_zone
        .as_deref()
        .or(event.time_zone.as_deref())
        .unwrap_or("UTC");
    let tz: chrono_tz::Tz = timezone
        .parse()
        .map_err(|_| EventTypeError::InvalidTimezone(timezone.to_string()))?;

    let local = |t: &DateTime<Utc>| t.with_timezone(&tz).format("%Y%m%dT%H%M%S").to_string();

    let mut rrule_text = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        timezone,
        local(&event.start_time),
        to_rrule(template, timezone, &local)
    );

    if !template.exclude_dates.is_empty() {
        let exdates: Vec<String> = template.exclude_dates.iter().map(&local).collect();
        rrule_text.push_str(&format!("\nEXDATE;TZID={}:{}", timezone, exdates.join(",")));
    }

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| EventTypeError::Expansion(format!("{}", e)))?;

    // `all` caps instances before EXDATE filtering, so widen the cap by the
    // number of exclusions and truncate afterwards.
    let limit = limit.unwrap_or(DEFAULT_EXPANSION_LIMIT);
    let exdate_buffer = u16::try_from(template.exclude_dates.len()).unwrap_or(u16::MAX);
    let instances = rrule_set.all(limit.saturating_add(exdate_buffer));
    let duration = event.end_time - event.start_time;

    let mut occurrences: Vec<Occurrence> = instances
        .dates
        .into_iter()
        .map(|dt| {
            let start: DateTime<Utc> = dt.with_timezone(&Utc);
            Occurrence {
                start,
                end: start + duration,
            }
        })
        .collect();
    occurrences.truncate(usize::from(limit));

    debug!(
        event_id = %event.id,
        timezone,
        occurrences = occurrences.len(),
        "expanded recurrence"
    );
    Ok(occurrences)
}

/// Lower a checked descriptor to an RRULE value.
///
/// `UNTIL` must share DTSTART's zone: UTC carries a `Z` suffix, other zones
/// use bare local time.
fn to_rrule(
    template: &RecurrenceTemplate,
    timezone: &str,
    local: &impl Fn(&DateTime<Utc>) -> String,
) -> String {
    let mut parts = vec![
        format!("FREQ={}", template.frequency.as_rrule()),
        format!("INTERVAL={}", template.interval),
    ];

    if let Some(count) = template.count {
        parts.push(format!("COUNT={}", count));
    }
    if let Some(end_date) = &template.end_date {
        let mut until = local(end_date);
        if timezone == "UTC" {
            until.push('Z');
        }
        parts.push(format!("UNTIL={}", until));
    }

    if let Some(days) = &template.days_of_week {
        let byday: Vec<&str> = days
            .iter()
            .filter_map(|d| usize::try_from(*d).ok().and_then(|d| WEEKDAYS.get(d)).copied())
            .collect();
        if !byday.is_empty() {
            parts.push(format!("BYDAY={}", byday.join(",")));
        }
    }
    if let Some(day) = template.day_of_month {
        parts.push(format!("BYMONTHDAY={}", day));
    }

    parts.join(";")
}

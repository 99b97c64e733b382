//! Detect time overlaps between an event and the other events in scope.
//!
//! Adjacent events (one ends exactly when the other starts) are NOT conflicts.

use crate::event::Event;

/// An event in scope that overlaps the one being checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict<'a> {
    pub other: &'a Event,
    pub overlap_minutes: i64,
}

/// Find every event in `others` whose interval overlaps `event`.
///
/// Two intervals overlap when `a.start < b.end && a.end > b.start`. An entry
/// sharing `event.id` is the event itself (e.g. an edit in progress) and is
/// skipped.
pub fn find_conflicts<'a>(event: &Event, others: &'a [Event]) -> Vec<Conflict<'a>> {
    others
        .iter()
        .filter(|other| other.id != event.id)
        .filter(|other| event.start_time < other.end_time && event.end_time > other.start_time)
        .map(|other| {
            let overlap_start = event.start_time.max(other.start_time);
            let overlap_end = event.end_time.min(other.end_time);
            Conflict {
                other,
                overlap_minutes: (overlap_end - overlap_start).num_minutes(),
            }
        })
        .collect()
}

/// `true` if any event in `others` overlaps `event`.
pub fn has_conflict(event: &Event, others: &[Event]) -> bool {
    !find_conflicts(event, others).is_empty()
}

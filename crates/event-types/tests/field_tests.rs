//! Tests for field-path resolution and value comparison.

use chrono::{DateTime, TimeZone, Utc};
use event_types::ast::{ComparisonOperator, Literal};
use event_types::event::EventMetadata;
use event_types::evaluator::{coerce_number, parse_date, parse_time};
use event_types::{compare_values, get_field_value, get_literal_value, Event, FieldValue, ValidationContext};
use serde_json::json;

fn path(p: &str) -> Vec<String> {
    p.split('.').map(str::to_string).collect()
}

fn start() -> DateTime<Utc> {
    // A Monday.
    Utc.with_ymd_and_hms(2026, 3, 2, 14, 45, 30).unwrap()
}

fn event() -> Event {
    Event::new("e1", "meeting", start(), start() + chrono::Duration::minutes(90))
        .with_title("Standup")
        .with_extra("room", json!("A"))
        .with_extra("attendees", json!(["ann", "bo", "cy"]))
        .with_extra("owner", json!({"name": "ann", "tags": ["lead"]}))
}

fn resolve(p: &str) -> FieldValue {
    get_field_value(&path(p), &event(), &ValidationContext::default())
}

fn json(value: serde_json::Value) -> FieldValue {
    FieldValue::Json(value)
}

// ---------------------------------------------------------------------------
// get_field_value
// ---------------------------------------------------------------------------

#[test]
fn instant_fields_resolve_to_instants() {
    assert_eq!(resolve("startTime"), FieldValue::Instant(start()));
    assert_eq!(
        resolve("endTime"),
        FieldValue::Instant(start() + chrono::Duration::minutes(90))
    );
}

#[test]
fn derived_time_properties_use_utc() {
    assert_eq!(resolve("startTime.hour"), json(json!(14)));
    assert_eq!(resolve("startTime.minute"), json(json!(45)));
    assert_eq!(resolve("startTime.second"), json(json!(30)));
    assert_eq!(resolve("startTime.day"), json(json!(2)));
    assert_eq!(resolve("startTime.month"), json(json!(3)));
    assert_eq!(resolve("startTime.year"), json(json!(2026)));
    assert_eq!(resolve("startTime.date"), json(json!("2026-03-02")));
    assert_eq!(resolve("startTime.dayOfWeek"), json(json!(1)));
    assert_eq!(resolve("endTime.hour"), json(json!(16)));
}

#[test]
fn unknown_derived_property_is_undefined() {
    assert!(resolve("startTime.fortnight").is_undefined());
    assert!(resolve("startTime.hour.extra").is_undefined());
}

#[test]
fn time_zone_property_falls_back_to_recurrence_zone() {
    let mut e = event();
    assert!(get_field_value(&path("startTime.timeZone"), &e, &ValidationContext::default())
        .is_undefined());

    let mut template = event_types::ast::RecurrenceTemplate::new(event_types::ast::Frequency::Daily);
    template.time_zone = Some("Europe/Paris".into());
    e.recurring = Some(template);
    assert_eq!(
        get_field_value(&path("startTime.timeZone"), &e, &ValidationContext::default()),
        json(json!("Europe/Paris"))
    );

    e.time_zone = Some("Asia/Tokyo".into());
    assert_eq!(
        get_field_value(&path("startTime.timeZone"), &e, &ValidationContext::default()),
        json(json!("Asia/Tokyo"))
    );
}

#[test]
fn top_level_scalars_resolve() {
    assert_eq!(resolve("title"), json(json!("Standup")));
    assert_eq!(resolve("type"), json(json!("meeting")));
    assert_eq!(resolve("id"), json(json!("e1")));
}

#[test]
fn missing_title_is_undefined() {
    let e = Event::new("e2", "meeting", start(), start() + chrono::Duration::hours(1));
    assert!(get_field_value(&path("title"), &e, &ValidationContext::default()).is_undefined());
}

#[test]
fn duration_is_whole_minutes() {
    assert_eq!(resolve("duration").to_number(), Some(90.0));
}

#[test]
fn duration_rounds_partial_minutes() {
    let e = Event::new("e2", "x", start(), start() + chrono::Duration::seconds(100));
    assert_eq!(
        get_field_value(&path("duration"), &e, &ValidationContext::default()).to_number(),
        Some(2.0)
    );
}

#[test]
fn payload_duration_takes_precedence() {
    let e = event().with_extra("duration", json!(15));
    assert_eq!(
        get_field_value(&path("duration"), &e, &ValidationContext::default()),
        json(json!(15))
    );
}

#[test]
fn now_prefers_context_instant() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let ctx = ValidationContext::default().at(now);

    assert_eq!(get_field_value(&path("now"), &event(), &ctx), FieldValue::Instant(now));
}

#[test]
fn now_without_context_uses_wall_clock() {
    let before = Utc::now();
    let value = resolve("now");
    let after = Utc::now();

    match value {
        FieldValue::Instant(t) => assert!(before <= t && t <= after),
        other => panic!("expected instant, got {:?}", other),
    }
}

#[test]
fn created_reads_metadata() {
    let created = Utc.with_ymd_and_hms(2025, 12, 24, 9, 0, 0).unwrap();
    let mut e = event();
    assert!(get_field_value(&path("created"), &e, &ValidationContext::default()).is_undefined());

    e.metadata = Some(EventMetadata {
        created_at: Some(created),
        ..Default::default()
    });
    assert_eq!(
        get_field_value(&path("created"), &e, &ValidationContext::default()),
        FieldValue::Instant(created)
    );
}

#[test]
fn extra_paths_walk_the_payload() {
    assert_eq!(resolve("extra.room"), json(json!("A")));
    assert_eq!(resolve("extra.owner.name"), json(json!("ann")));
    assert_eq!(resolve("extra.owner.tags.0"), json(json!("lead")));
    assert!(resolve("extra.owner.missing").is_undefined());
    assert!(resolve("extra.room.deeper").is_undefined());
}

#[test]
fn count_on_array_yields_length() {
    assert_eq!(resolve("extra.attendees.count"), json(json!(3)));
    assert_eq!(resolve("attendees.count"), json(json!(3)));
}

#[test]
fn count_on_object_is_a_key_lookup() {
    let e = event().with_extra("stats", json!({"count": "many"}));
    assert_eq!(
        get_field_value(&path("extra.stats.count"), &e, &ValidationContext::default()),
        json(json!("many"))
    );
}

#[test]
fn bare_multi_segment_path_walks_payload() {
    assert_eq!(resolve("owner.name"), json(json!("ann")));
}

#[test]
fn bare_single_segment_is_payload_key() {
    assert_eq!(resolve("room"), json(json!("A")));
    assert!(resolve("nothing").is_undefined());
}

#[test]
fn payload_null_is_not_undefined() {
    let e = event().with_extra("note", serde_json::Value::Null);
    let value = get_field_value(&path("extra.note"), &e, &ValidationContext::default());

    assert!(!value.is_undefined());
    assert!(value.is_nullish());
}

#[test]
fn user_paths_walk_the_user_when_present() {
    let user = json!({"role": "admin", "teams": ["a", "b"]});
    let ctx = ValidationContext::default().as_user(&user);

    assert_eq!(get_field_value(&path("user.role"), &event(), &ctx), json(json!("admin")));
    assert_eq!(get_field_value(&path("user.teams.count"), &event(), &ctx), json(json!(2)));
    assert!(get_field_value(&path("user.missing.deep"), &event(), &ctx).is_undefined());
}

#[test]
fn user_paths_without_user_fall_through_to_payload() {
    let e = event().with_extra("user", json!({"role": "guest"}));
    assert_eq!(
        get_field_value(&path("user.role"), &e, &ValidationContext::default()),
        json(json!("guest"))
    );
}

#[test]
fn empty_path_is_undefined() {
    assert!(get_field_value(&[], &event(), &ValidationContext::default()).is_undefined());
}

// ---------------------------------------------------------------------------
// Literals and coercion
// ---------------------------------------------------------------------------

#[test]
fn duration_literals_resolve_to_minutes() {
    assert_eq!(get_literal_value(&Literal::duration(2.0, "hours")).to_number(), Some(120.0));
    assert_eq!(get_literal_value(&Literal::duration(1.0, "days")).to_number(), Some(1440.0));
    assert_eq!(get_literal_value(&Literal::duration(1.0, "weeks")).to_number(), Some(10080.0));
    assert_eq!(get_literal_value(&Literal::duration(7.0, "fortnights")).to_number(), Some(7.0));
}

#[test]
fn plain_literals_pass_through() {
    assert_eq!(get_literal_value(&Literal::from(json!("x"))), json(json!("x")));
}

#[test]
fn number_coercion_rules() {
    assert_eq!(json(json!(null)).to_number(), Some(0.0));
    assert_eq!(json(json!(true)).to_number(), Some(1.0));
    assert_eq!(json(json!("  ")).to_number(), Some(0.0));
    assert_eq!(json(json!(" 4.5 ")).to_number(), Some(4.5));
    assert_eq!(json(json!("abc")).to_number(), None);
    assert_eq!(json(json!([1])).to_number(), None);
    assert_eq!(FieldValue::Undefined.to_number(), None);
}

#[test]
fn duration_shaped_values_coerce_to_minutes() {
    assert_eq!(coerce_number(&json(json!({"value": 3, "unit": "hours"}))), Some(180.0));
    assert_eq!(coerce_number(&json(json!({"value": 3}))), None);
}

// ---------------------------------------------------------------------------
// compare_values
// ---------------------------------------------------------------------------

fn cmp(left: FieldValue, op: &str, right: FieldValue) -> bool {
    compare_values(&left, &right, &ComparisonOperator::from(op))
}

#[test]
fn dates_compare_chronologically() {
    assert!(cmp(json(json!("2026-01-31")), "<", json(json!("2026-02-01"))));
    assert!(cmp(json(json!("2026-02-01")), "equals", json(json!("2026-02-01"))));
    assert!(!cmp(json(json!("2026-02-01")), ">", json(json!("2026-02-01"))));
}

#[test]
fn times_compare_as_minutes() {
    assert!(cmp(json(json!("09:30")), "<", json(json!("10:00"))));
    assert!(cmp(json(json!("09:30")), "is", json(json!("09:30:00"))));
    assert!(cmp(json(json!("23:59:30")), ">", json(json!("23:59"))));
}

#[test]
fn single_digit_hours_compare_as_times() {
    assert!(cmp(json(json!("9:30")), "<", json(json!("10:00"))));
    assert!(cmp(json(json!("9:30")), "is", json(json!("09:30"))));
}

#[test]
fn malformed_times_are_plain_strings() {
    // Minutes need two digits, so both sides stay strings and ordering fails.
    assert!(!cmp(json(json!("9:3")), "<", json(json!("10:00"))));
    assert!(!cmp(json(json!("24:00")), "is", json(json!("00:00"))));
}

#[test]
fn instants_compare_as_milliseconds() {
    let a = FieldValue::Instant(start());
    let b = FieldValue::Instant(start() + chrono::Duration::seconds(1));

    assert!(cmp(a.clone(), "<", b.clone()));
    assert!(cmp(a.clone(), "is", a.clone()));
    assert!(cmp(a.clone(), "is", json(json!(start().timestamp_millis()))));
    assert!(cmp(b, "not equals", a));
}

#[test]
fn equality_is_strict() {
    assert!(!cmp(json(json!(1)), "equals", json(json!("1"))));
    assert!(!cmp(json(json!(null)), "equals", FieldValue::Undefined));
    assert!(cmp(FieldValue::Undefined, "is", FieldValue::Undefined));
    assert!(cmp(json(json!(1)), "equals", json(json!(1.0))));
    assert!(cmp(json(json!(1)), "is not", json(json!("1"))));
}

#[test]
fn ordering_is_numeric() {
    assert!(cmp(json(json!("10")), ">", json(json!(9))));
    assert!(cmp(json(json!(true)), ">=", json(json!(1))));
    assert!(!cmp(json(json!("apple")), "<", json(json!("banana"))));
    assert!(!cmp(FieldValue::Undefined, "<", json(json!(1))));
}

#[test]
fn unknown_operator_is_false() {
    assert!(!cmp(json(json!(1)), "contains", json(json!(1))));
}

#[test]
fn date_and_time_parsing_is_strict() {
    assert!(parse_date("2024-02-29").is_some());
    assert!(parse_date("2023-02-29").is_none());
    assert!(parse_date("2024-2-01").is_none());
    assert!(parse_date("2024-02-01T00:00").is_none());

    assert_eq!(parse_time("01:30"), Some(90.0));
    assert_eq!(parse_time("00:00:30"), Some(0.5));
    assert_eq!(parse_time("9:30"), Some(570.0));
    assert!(parse_time("9:3").is_none());
    assert!(parse_time("123:00").is_none());
    assert!(parse_time(":30").is_none());
    assert!(parse_time("12:60").is_none());
    assert!(parse_time("12:00:00:00").is_none());
}

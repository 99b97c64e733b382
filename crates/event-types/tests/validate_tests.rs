//! Tests for the declared rule tree: every rule kind, combinators, and
//! aggregation of errors across rules.

use chrono::{DateTime, TimeZone, Utc};
use event_types::ast::{
    Comparison, ComparisonOperator, EventTypeDeclaration, Expression, FieldAccess, Literal,
    Operand, ValidationRule,
};
use event_types::{compile, CompiledEventType, Event, ValidationContext};
use serde_json::json;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
}

fn event(id: &str, start: (u32, u32), end: (u32, u32)) -> Event {
    Event::new(id, "meeting", at(start.0, start.1), at(end.0, end.1))
}

fn meeting() -> Event {
    event("m1", (10, 0), (11, 0))
}

fn compiled_with(rules: Vec<ValidationRule>) -> CompiledEventType {
    let mut decl = EventTypeDeclaration::new("meeting", "Meeting");
    decl.validate = rules;
    compile(&decl)
}

fn lit(value: serde_json::Value) -> Literal {
    Literal::from(value)
}

fn between(path: &[&str], min: Literal, max: Literal) -> ValidationRule {
    ValidationRule::Between {
        field: FieldAccess::new(path),
        min,
        max,
    }
}

fn comparison(path: &[&str], operator: &str, right: serde_json::Value) -> Comparison {
    Comparison {
        operator: ComparisonOperator::from(operator),
        left: Operand::field(path),
        right: lit(right),
    }
}

// ---------------------------------------------------------------------------
// Between
// ---------------------------------------------------------------------------

#[test]
fn between_out_of_range_is_invalid() {
    let compiled = compiled_with(vec![between(&["extra", "priority"], lit(json!(1)), lit(json!(10)))]);

    let result = compiled.validate(
        &meeting().with_extra("priority", json!(15)),
        &ValidationContext::default(),
    );

    assert!(!result.valid);
    assert_eq!(result.errors, vec!["extra.priority must be between 1 and 10"]);
}

#[test]
fn between_in_range_is_valid() {
    let compiled = compiled_with(vec![between(&["extra", "priority"], lit(json!(1)), lit(json!(10)))]);

    let result = compiled.validate(
        &meeting().with_extra("priority", json!(5)),
        &ValidationContext::default(),
    );

    assert!(result.valid);
    assert!(result.errors.is_empty());
}

#[test]
fn between_bounds_are_inclusive() {
    let compiled = compiled_with(vec![between(&["extra", "priority"], lit(json!(1)), lit(json!(10)))]);
    let ctx = ValidationContext::default();

    assert!(compiled.validate(&meeting().with_extra("priority", json!(1)), &ctx).valid);
    assert!(compiled.validate(&meeting().with_extra("priority", json!(10)), &ctx).valid);
}

#[test]
fn between_undefined_field_reports_undefined() {
    let compiled = compiled_with(vec![between(&["extra", "priority"], lit(json!(1)), lit(json!(10)))]);

    let result = compiled.validate(&meeting(), &ValidationContext::default());

    assert_eq!(result.errors, vec!["extra.priority is undefined"]);
}

#[test]
fn between_non_numeric_field_reports_numeric_failure() {
    let compiled = compiled_with(vec![between(&["extra", "priority"], lit(json!(1)), lit(json!(10)))]);

    let result = compiled.validate(
        &meeting().with_extra("priority", json!("high")),
        &ValidationContext::default(),
    );

    assert_eq!(
        result.errors,
        vec!["extra.priority cannot be compared numerically"]
    );
}

#[test]
fn between_numeric_string_is_coerced() {
    let compiled = compiled_with(vec![between(&["extra", "priority"], lit(json!(1)), lit(json!(10)))]);

    let result = compiled.validate(
        &meeting().with_extra("priority", json!("7")),
        &ValidationContext::default(),
    );

    assert!(result.valid);
}

#[test]
fn between_duration_bounds_resolve_to_minutes() {
    // 90-minute event against [30 minutes, 1 hour]
    let compiled = compiled_with(vec![between(
        &["duration"],
        Literal::duration(30.0, "minutes"),
        Literal::duration(1.0, "hours"),
    )]);

    let long = event("m1", (10, 0), (11, 30));
    let short = event("m2", (10, 0), (10, 45));

    let result = compiled.validate(&long, &ValidationContext::default());
    assert_eq!(
        result.errors,
        vec!["duration must be between 30 minutes and 1 hours"]
    );
    assert!(compiled.validate(&short, &ValidationContext::default()).valid);
}

#[test]
fn between_duration_shaped_payload_value_resolves_to_minutes() {
    let compiled = compiled_with(vec![between(
        &["extra", "buffer"],
        lit(json!(0)),
        lit(json!(60)),
    )]);

    let result = compiled.validate(
        &meeting().with_extra("buffer", json!({"value": 2, "unit": "hours"})),
        &ValidationContext::default(),
    );

    assert_eq!(result.errors, vec!["extra.buffer must be between 0 and 60"]);
}

// ---------------------------------------------------------------------------
// In
// ---------------------------------------------------------------------------

#[test]
fn in_accepts_listed_value() {
    let compiled = compiled_with(vec![ValidationRule::In {
        field: FieldAccess::new(&["extra", "room"]),
        values: vec![lit(json!("A")), lit(json!("B"))],
    }]);

    let result = compiled.validate(
        &meeting().with_extra("room", json!("B")),
        &ValidationContext::default(),
    );

    assert!(result.valid);
}

#[test]
fn in_rejects_unlisted_value() {
    let compiled = compiled_with(vec![ValidationRule::In {
        field: FieldAccess::new(&["extra", "room"]),
        values: vec![lit(json!("A")), lit(json!("B"))],
    }]);

    let result = compiled.validate(
        &meeting().with_extra("room", json!("C")),
        &ValidationContext::default(),
    );

    assert_eq!(result.errors, vec!["extra.room must be one of: A, B"]);
}

#[test]
fn in_undefined_field_is_an_error() {
    let compiled = compiled_with(vec![ValidationRule::In {
        field: FieldAccess::new(&["extra", "room"]),
        values: vec![lit(json!("A"))],
    }]);

    let result = compiled.validate(&meeting(), &ValidationContext::default());

    assert_eq!(result.errors, vec!["extra.room is undefined"]);
}

#[test]
fn in_uses_date_aware_equality() {
    let compiled = compiled_with(vec![ValidationRule::In {
        field: FieldAccess::new(&["startTime", "date"]),
        values: vec![lit(json!("2026-03-01")), lit(json!("2026-03-02"))],
    }]);

    assert!(compiled.validate(&meeting(), &ValidationContext::default()).valid);
}

#[test]
fn in_is_strict_about_types() {
    let compiled = compiled_with(vec![ValidationRule::In {
        field: FieldAccess::new(&["extra", "priority"]),
        values: vec![lit(json!("5"))],
    }]);

    let result = compiled.validate(
        &meeting().with_extra("priority", json!(5)),
        &ValidationContext::default(),
    );

    assert!(!result.valid, "number 5 is not equal to string \"5\"");
}

// ---------------------------------------------------------------------------
// ModComparison
// ---------------------------------------------------------------------------

fn every_other(operator: &str, right: serde_json::Value, mod_value: serde_json::Value) -> ValidationRule {
    ValidationRule::ModComparison {
        left: FieldAccess::new(&["extra", "week"]),
        mod_value: lit(mod_value),
        operator: ComparisonOperator::from(operator),
        right: lit(right),
    }
}

#[test]
fn mod_comparison_passes_when_remainder_matches() {
    let compiled = compiled_with(vec![every_other("equals", json!(0), json!(2))]);

    let result = compiled.validate(
        &meeting().with_extra("week", json!(14)),
        &ValidationContext::default(),
    );

    assert!(result.valid);
}

#[test]
fn mod_comparison_fails_when_remainder_differs() {
    let compiled = compiled_with(vec![every_other("equals", json!(0), json!(2))]);

    let result = compiled.validate(
        &meeting().with_extra("week", json!(15)),
        &ValidationContext::default(),
    );

    assert_eq!(result.errors, vec!["extra.week modulo 2 must be equals 0"]);
}

#[test]
fn mod_comparison_by_zero_is_an_error() {
    let compiled = compiled_with(vec![every_other("equals", json!(0), json!(0))]);

    let result = compiled.validate(
        &meeting().with_extra("week", json!(4)),
        &ValidationContext::default(),
    );

    assert_eq!(result.errors, vec!["Modulo value for extra.week must be non-zero"]);
}

#[test]
fn mod_comparison_non_numeric_operand_is_an_error() {
    let compiled = compiled_with(vec![every_other("equals", json!(0), json!(2))]);

    let result = compiled.validate(
        &meeting().with_extra("week", json!("odd")),
        &ValidationContext::default(),
    );

    assert_eq!(
        result.errors,
        vec!["extra.week modulo 2 cannot be compared numerically"]
    );
}

#[test]
fn mod_comparison_supports_ordering_operators() {
    let compiled = compiled_with(vec![every_other("<", json!(3), json!(7))]);
    let ctx = ValidationContext::default();

    assert!(compiled.validate(&meeting().with_extra("week", json!(9)), &ctx).valid);
    assert!(!compiled.validate(&meeting().with_extra("week", json!(13)), &ctx).valid);
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[test]
fn comparison_rule_on_derived_time_property() {
    let compiled = compiled_with(vec![ValidationRule::Comparison(comparison(
        &["startTime", "hour"],
        ">=",
        json!(9),
    ))]);

    let early = event("m1", (8, 0), (9, 0));

    assert!(compiled.validate(&meeting(), &ValidationContext::default()).valid);
    let result = compiled.validate(&early, &ValidationContext::default());
    assert_eq!(result.errors, vec!["Comparison failed: startTime.hour >= 9"]);
}

#[test]
fn comparison_rule_with_unknown_operator_fails() {
    let compiled = compiled_with(vec![ValidationRule::Comparison(comparison(
        &["extra", "priority"],
        "~=",
        json!(1),
    ))]);

    let result = compiled.validate(
        &meeting().with_extra("priority", json!(1)),
        &ValidationContext::default(),
    );

    assert!(!result.valid);
}

#[test]
fn comparison_rule_with_literal_left_side() {
    let compiled = compiled_with(vec![ValidationRule::Comparison(Comparison {
        operator: ComparisonOperator::LessThan,
        left: Operand::Literal(lit(json!("09:00"))),
        right: lit(json!("17:30")),
    })]);

    assert!(compiled.validate(&meeting(), &ValidationContext::default()).valid);
}

// ---------------------------------------------------------------------------
// Conflict / NoConflict
// ---------------------------------------------------------------------------

#[test]
fn no_conflict_rejects_overlapping_event() {
    let compiled = compiled_with(vec![ValidationRule::NoConflict]);
    let first = meeting();
    let others = vec![event("m2", (10, 30), (11, 30))];

    let result = compiled.validate(&first, &ValidationContext::default().with_events(&others));

    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("conflicts"));
    assert!(result.errors[0].contains("m2"));
}

#[test]
fn conflict_accepts_overlapping_event() {
    let compiled = compiled_with(vec![ValidationRule::Conflict]);
    let others = vec![event("m2", (10, 30), (11, 30))];

    let result = compiled.validate(&meeting(), &ValidationContext::default().with_events(&others));

    assert!(result.valid);
}

#[test]
fn conflict_rejects_when_nothing_overlaps() {
    let compiled = compiled_with(vec![ValidationRule::Conflict]);
    let others = vec![event("m2", (12, 0), (13, 0))];

    let result = compiled.validate(&meeting(), &ValidationContext::default().with_events(&others));

    assert_eq!(result.errors, vec!["Event must conflict with an existing event"]);
}

#[test]
fn no_conflict_ignores_adjacent_events() {
    let compiled = compiled_with(vec![ValidationRule::NoConflict]);
    let others = vec![event("m2", (11, 0), (12, 0)), event("m3", (9, 0), (10, 0))];

    let result = compiled.validate(&meeting(), &ValidationContext::default().with_events(&others));

    assert!(result.valid);
}

#[test]
fn no_conflict_skips_the_event_itself() {
    let compiled = compiled_with(vec![ValidationRule::NoConflict]);
    let others = vec![meeting()];

    let result = compiled.validate(&meeting(), &ValidationContext::default().with_events(&others));

    assert!(result.valid);
}

// ---------------------------------------------------------------------------
// When and logical combinators
// ---------------------------------------------------------------------------

fn when_urgent(rules: Vec<ValidationRule>) -> ValidationRule {
    ValidationRule::When {
        condition: Expression::Comparison(comparison(&["extra", "kind"], "is", json!("urgent"))),
        rules,
    }
}

#[test]
fn when_true_evaluates_nested_rules() {
    let compiled = compiled_with(vec![when_urgent(vec![
        between(&["extra", "priority"], lit(json!(8)), lit(json!(10))),
        ValidationRule::In {
            field: FieldAccess::new(&["extra", "room"]),
            values: vec![lit(json!("war-room"))],
        },
    ])]);

    let result = compiled.validate(
        &meeting()
            .with_extra("kind", json!("urgent"))
            .with_extra("priority", json!(3))
            .with_extra("room", json!("lobby")),
        &ValidationContext::default(),
    );

    assert_eq!(
        result.errors,
        vec![
            "extra.priority must be between 8 and 10",
            "extra.room must be one of: war-room",
        ]
    );
}

#[test]
fn when_false_skips_nested_rules() {
    let compiled = compiled_with(vec![when_urgent(vec![between(
        &["extra", "priority"],
        lit(json!(8)),
        lit(json!(10)),
    )])]);

    let result = compiled.validate(
        &meeting().with_extra("kind", json!("routine")),
        &ValidationContext::default(),
    );

    assert!(result.valid, "priority is undefined but the body never runs");
}

#[test]
fn binary_and_rule_requires_both_sides() {
    let rule = ValidationRule::BinaryExpr(event_types::ast::BinaryExpr::new(
        event_types::ast::LogicalOperator::And,
        Expression::field(&["extra", "approved"]),
        Expression::Comparison(comparison(&["extra", "seats"], ">", json!(0))),
    ));
    let compiled = compiled_with(vec![rule]);
    let ctx = ValidationContext::default();

    let ok = meeting()
        .with_extra("approved", json!(true))
        .with_extra("seats", json!(4));
    let not_approved = meeting()
        .with_extra("approved", json!(false))
        .with_extra("seats", json!(4));

    assert!(compiled.validate(&ok, &ctx).valid);
    let result = compiled.validate(&not_approved, &ctx);
    assert_eq!(
        result.errors,
        vec!["Condition not satisfied: (extra.approved and extra.seats > 0)"]
    );
}

#[test]
fn binary_or_rule_needs_either_side() {
    let rule = ValidationRule::BinaryExpr(event_types::ast::BinaryExpr::new(
        event_types::ast::LogicalOperator::Or,
        Expression::field(&["extra", "approved"]),
        Expression::field(&["extra", "override"]),
    ));
    let compiled = compiled_with(vec![rule]);
    let ctx = ValidationContext::default();

    assert!(compiled.validate(&meeting().with_extra("override", json!(true)), &ctx).valid);
    assert!(!compiled.validate(&meeting(), &ctx).valid);
}

#[test]
fn unary_not_rule_negates() {
    let rule = match Expression::not(Expression::field(&["extra", "cancelled"])) {
        Expression::UnaryExpr(un) => ValidationRule::UnaryExpr(un),
        _ => unreachable!(),
    };
    let compiled = compiled_with(vec![rule]);
    let ctx = ValidationContext::default();

    assert!(compiled.validate(&meeting(), &ctx).valid);
    let result = compiled.validate(&meeting().with_extra("cancelled", json!(true)), &ctx);
    assert_eq!(result.errors, vec!["Condition not satisfied: not extra.cancelled"]);
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[test]
fn all_rule_errors_are_reported_in_one_pass() {
    let compiled = compiled_with(vec![
        between(&["extra", "priority"], lit(json!(1)), lit(json!(10))),
        ValidationRule::In {
            field: FieldAccess::new(&["extra", "room"]),
            values: vec![lit(json!("A"))],
        },
        ValidationRule::NoConflict,
    ]);
    let others = vec![event("m2", (10, 30), (11, 30))];

    let result = compiled.validate(
        &meeting()
            .with_extra("priority", json!(99))
            .with_extra("room", json!("Z")),
        &ValidationContext::default().with_events(&others),
    );

    assert_eq!(result.errors.len(), 3);
}

#[test]
fn base_invariant_errors_precede_rule_errors() {
    let compiled = compiled_with(vec![between(&["extra", "priority"], lit(json!(1)), lit(json!(10)))]);
    let backwards = event("m1", (11, 0), (10, 0)).with_extra("priority", json!(0));

    let result = compiled.validate(&backwards, &ValidationContext::default());

    assert_eq!(
        result.errors,
        vec![
            "Start time must be before end time",
            "extra.priority must be between 1 and 10",
        ]
    );
}

#[test]
fn validation_result_serializes_without_errors_when_valid() {
    let compiled = compiled_with(Vec::new());

    let result = compiled.validate(&meeting(), &ValidationContext::default());

    assert_eq!(serde_json::to_value(&result).unwrap(), json!({"valid": true}));
}

//! Runtime evaluator: validate, render, and authorize events against a
//! compiled type.
//!
//! Everything here is a pure function of `(CompiledEventType, Event, context)`.
//! Validation is total: every top-level rule runs and every violation is
//! reported. The only short-circuit is a `When` rule skipping its body.
//!
//! ## Modules
//!
//! - [`fields`] — dotted field-path resolution
//! - [`compare`] — literal normalization and date/time-aware comparison
//! - [`temporal`] — base temporal invariants from named constraints

pub mod compare;
pub mod fields;
pub mod temporal;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::ast::{
    BehaviorAction, BehaviorValue, ComparisonOperator, DisplayExpression, DisplayProperty,
    DisplayValue, Expression, FieldAccess, Literal, LogicalOperator, Operand, TemplatePart,
    ValidationRule,
};
use crate::compiler::CompiledEventType;
use crate::conflict::find_conflicts;
use crate::event::{
    BehaviorConfig, Event, RenderContext, RenderedEvent, ValidationContext, ValidationResult,
    DEFAULT_COLOR,
};
use crate::value::{display_json, format_instant, format_number, FieldValue};

pub use compare::{
    compare_values, duration_in_minutes, get_literal_value, parse_date, parse_time, unit_multiplier,
};
pub use fields::get_field_value;
pub use temporal::check_invariants;

impl CompiledEventType {
    /// Validate an event: base temporal invariants first, then every declared
    /// rule. Errors from both stages are concatenated.
    pub fn validate(&self, event: &Event, ctx: &ValidationContext<'_>) -> ValidationResult {
        let mut errors = check_invariants(&self.constraints, event, ctx);

        for rule in &self.validate {
            let rule_errors = evaluate_rule(rule, event, ctx);
            if !rule_errors.is_empty() {
                trace!(type_id = %self.id, event_id = %event.id, ?rule_errors, "rule failed");
            }
            errors.extend(rule_errors);
        }

        debug!(
            type_id = %self.id,
            event_id = %event.id,
            errors = errors.len(),
            "validated event"
        );
        ValidationResult::from_errors(errors)
    }

    /// Render an event by evaluating every display rule in order.
    ///
    /// `color`, `title` and `description` are coerced to strings; `icon`
    /// keeps whatever value its rule produced.
    pub fn render(&self, event: &Event, ctx: &RenderContext<'_>) -> RenderedEvent {
        let scope = ValidationContext::from(*ctx);
        let mut rendered = RenderedEvent {
            title: event.title.clone().unwrap_or_else(|| self.name.clone()),
            color: DEFAULT_COLOR.to_string(),
            icon: None,
            description: Some(String::new()),
            all_day: event.all_day,
            extra: Map::new(),
        };

        for rule in &self.display {
            let value = evaluate_display(&rule.value, event, &scope);
            match &rule.name {
                DisplayProperty::Color => rendered.color = display_string(&value),
                DisplayProperty::Icon => rendered.icon = Some(value),
                DisplayProperty::Title => rendered.title = display_string(&value),
                DisplayProperty::Description => {
                    rendered.description = Some(display_string(&value))
                }
                DisplayProperty::Other(name) => {
                    rendered.extra.insert(name.clone(), value);
                }
            }
        }

        rendered
    }

    /// Whether `user` may perform `action` on `event`.
    ///
    /// The first behavior rule named `action` decides. With no such rule the
    /// answer is `false`.
    pub fn can_perform(&self, action: &str, event: &Event, user: Option<&Value>) -> bool {
        let Some(rule) = self.behavior.iter().find(|r| r.name.as_str() == action) else {
            return false;
        };
        match &rule.value {
            BehaviorValue::Flag(allowed) => *allowed,
            BehaviorValue::Expression(condition) => {
                let ctx = ValidationContext {
                    user,
                    ..Default::default()
                };
                evaluate_condition(condition, event, &ctx)
            }
        }
    }

    /// All four behavior flags for one event and user: a declared rule is
    /// evaluated with [`CompiledEventType::can_perform`], an undeclared flag
    /// keeps its default.
    pub fn resolve_behavior(&self, event: &Event, user: Option<&Value>) -> BehaviorConfig {
        let defaults = BehaviorConfig::default();
        let flag = |action: BehaviorAction, default: bool| {
            if self.behavior.iter().any(|r| r.name == action) {
                self.can_perform(action.as_str(), event, user)
            } else {
                default
            }
        };
        BehaviorConfig {
            draggable: flag(BehaviorAction::Draggable, defaults.draggable),
            resizable: flag(BehaviorAction::Resizable, defaults.resizable),
            editable: flag(BehaviorAction::Editable, defaults.editable),
            deletable: flag(BehaviorAction::Deletable, defaults.deletable),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation rules
// ---------------------------------------------------------------------------

/// Evaluate one rule, returning its violations (empty when it holds).
pub fn evaluate_rule(
    rule: &ValidationRule,
    event: &Event,
    ctx: &ValidationContext<'_>,
) -> Vec<String> {
    match rule {
        ValidationRule::Between { field, min, max } => check_between(field, min, max, event, ctx),
        ValidationRule::In { field, values } => check_in(field, values, event, ctx),
        ValidationRule::ModComparison {
            left,
            mod_value,
            operator,
            right,
        } => {
            let value = get_field_value(&left.path, event, ctx);
            if value.is_undefined() {
                return vec![format!("{} is undefined", left)];
            }
            let (Some(dividend), Some(divisor)) =
                (coerce_number(&value), get_literal_value(mod_value).to_number())
            else {
                return vec![format!(
                    "{} modulo {} cannot be compared numerically",
                    left, mod_value
                )];
            };
            if divisor == 0.0 {
                return vec![format!("Modulo value for {} must be non-zero", left)];
            }
            let remainder = FieldValue::from(dividend % divisor);
            if compare_values(&remainder, &get_literal_value(right), operator) {
                Vec::new()
            } else {
                vec![format!(
                    "{} modulo {} must be {} {}",
                    left, mod_value, operator, right
                )]
            }
        }
        ValidationRule::Comparison(cmp) => {
            let left = evaluate_operand(&cmp.left, event, ctx);
            if compare_values(&left, &get_literal_value(&cmp.right), &cmp.operator) {
                Vec::new()
            } else {
                vec![format!("Comparison failed: {}", cmp)]
            }
        }
        ValidationRule::Conflict => {
            if find_conflicts(event, ctx.events).is_empty() {
                vec!["Event must conflict with an existing event".to_string()]
            } else {
                Vec::new()
            }
        }
        ValidationRule::NoConflict => {
            let conflicts = find_conflicts(event, ctx.events);
            if conflicts.is_empty() {
                Vec::new()
            } else {
                let ids: Vec<&str> = conflicts.iter().map(|c| c.other.id.as_str()).collect();
                vec![format!(
                    "Event conflicts with existing event(s): {}",
                    ids.join(", ")
                )]
            }
        }
        ValidationRule::When { condition, rules } => {
            if evaluate_condition(condition, event, ctx) {
                rules
                    .iter()
                    .flat_map(|nested| evaluate_rule(nested, event, ctx))
                    .collect()
            } else {
                Vec::new()
            }
        }
        ValidationRule::BinaryExpr(bin) => {
            let expr = Expression::BinaryExpr(bin.clone());
            check_expression(&expr, event, ctx)
        }
        ValidationRule::UnaryExpr(un) => {
            let expr = Expression::UnaryExpr(un.clone());
            check_expression(&expr, event, ctx)
        }
        ValidationRule::Unknown => Vec::new(),
    }
}

fn check_between(
    field: &FieldAccess,
    min: &Literal,
    max: &Literal,
    event: &Event,
    ctx: &ValidationContext<'_>,
) -> Vec<String> {
    let value = get_field_value(&field.path, event, ctx);
    if value.is_undefined() {
        return vec![format!("{} is undefined", field)];
    }
    let Some(n) = coerce_number(&value) else {
        return vec![format!("{} cannot be compared numerically", field)];
    };
    let (Some(lo), Some(hi)) = (
        get_literal_value(min).to_number(),
        get_literal_value(max).to_number(),
    ) else {
        return vec![format!("Bounds for {} cannot be compared numerically", field)];
    };
    if n < lo || n > hi {
        vec![format!("{} must be between {} and {}", field, min, max)]
    } else {
        Vec::new()
    }
}

fn check_in(
    field: &FieldAccess,
    values: &[Literal],
    event: &Event,
    ctx: &ValidationContext<'_>,
) -> Vec<String> {
    let value = get_field_value(&field.path, event, ctx);
    if value.is_undefined() {
        return vec![format!("{} is undefined", field)];
    }
    let allowed = values.iter().any(|lit| {
        compare_values(&value, &get_literal_value(lit), &ComparisonOperator::Equals)
    });
    if allowed {
        Vec::new()
    } else {
        let options: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        vec![format!("{} must be one of: {}", field, options.join(", "))]
    }
}

fn check_expression(expr: &Expression, event: &Event, ctx: &ValidationContext<'_>) -> Vec<String> {
    if evaluate_condition(expr, event, ctx) {
        Vec::new()
    } else {
        vec![format!("Condition not satisfied: {}", expr)]
    }
}

/// Numeric value of a resolved field. Duration-shaped payload values
/// (`{"value": 2, "unit": "hours"}`) convert to minutes first.
pub fn coerce_number(value: &FieldValue) -> Option<f64> {
    if let Some(Value::Object(map)) = value.as_json() {
        if let (Some(n), Some(unit)) = (
            map.get("value").and_then(Value::as_f64),
            map.get("unit").and_then(Value::as_str),
        ) {
            return Some(duration_in_minutes(n, unit));
        }
    }
    value.to_number()
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Evaluate an expression as a boolean.
///
/// Both operands of `and`/`or` are always evaluated. Evaluation is free of
/// side effects, so this matches short-circuit semantics.
pub fn evaluate_condition(expr: &Expression, event: &Event, ctx: &ValidationContext<'_>) -> bool {
    match expr {
        Expression::FieldAccess(access) => get_field_value(&access.path, event, ctx).is_truthy(),
        Expression::Comparison(cmp) => {
            let left = evaluate_operand(&cmp.left, event, ctx);
            compare_values(&left, &get_literal_value(&cmp.right), &cmp.operator)
        }
        Expression::BinaryExpr(bin) => {
            let left = evaluate_condition(&bin.left, event, ctx);
            let right = evaluate_condition(&bin.right, event, ctx);
            match bin.operator {
                LogicalOperator::And => left && right,
                LogicalOperator::Or => left || right,
            }
        }
        Expression::UnaryExpr(un) => !evaluate_condition(&un.argument, event, ctx),
    }
}

/// Value of a comparison's left side. Field references resolve to their
/// value; any other expression yields its boolean result.
fn evaluate_operand(operand: &Operand, event: &Event, ctx: &ValidationContext<'_>) -> FieldValue {
    match operand {
        Operand::Literal(lit) => get_literal_value(lit),
        Operand::Expression(expr) => match expr.as_ref() {
            Expression::FieldAccess(access) => get_field_value(&access.path, event, ctx),
            other => FieldValue::Json(Value::Bool(evaluate_condition(other, event, ctx))),
        },
    }
}

// ---------------------------------------------------------------------------
// Display values
// ---------------------------------------------------------------------------

fn evaluate_display(value: &DisplayValue, event: &Event, ctx: &ValidationContext<'_>) -> Value {
    match value {
        DisplayValue::Literal(v) => v.clone(),
        DisplayValue::Computed(DisplayExpression::Conditional {
            condition,
            consequent,
            alternate,
        }) => {
            if evaluate_condition(condition, event, ctx) {
                evaluate_display(consequent, event, ctx)
            } else {
                match alternate {
                    Some(alt) => evaluate_display(alt, event, ctx),
                    None => Value::String(String::new()),
                }
            }
        }
        DisplayValue::Computed(DisplayExpression::Template { parts }) => {
            let text: String = parts
                .iter()
                .map(|part| template_part(part, event, ctx))
                .collect();
            Value::String(text)
        }
    }
}

fn template_part(part: &TemplatePart, event: &Event, ctx: &ValidationContext<'_>) -> String {
    match part {
        TemplatePart::Text(s) => s.clone(),
        TemplatePart::Field(access) => match get_field_value(&access.path, event, ctx) {
            FieldValue::Instant(t) => format_instant(&t),
            FieldValue::Json(Value::String(s)) => s,
            FieldValue::Json(Value::Number(n)) => n
                .as_f64()
                .map_or_else(|| n.to_string(), format_number),
            FieldValue::Json(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        },
        TemplatePart::Other(_) => String::new(),
    }
}

/// String coercion for `color`, `title` and `description`. `null` renders
/// as the empty string.
fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => display_json(other),
    }
}

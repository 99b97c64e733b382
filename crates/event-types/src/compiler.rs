//! Compiler: declaration AST → [`CompiledEventType`].
//!
//! Compilation never fails. It derives the structural schema for `extra`,
//! passes the rule lists through untouched, and precomputes the literal-only
//! inputs of the three context-free fast paths:
//!
//! - [`CompiledEventType::base_validate`] — required-field presence only
//! - [`CompiledEventType::base_render`] — literal `color`/`icon` rules only
//! - [`CompiledEventType::default_behavior`] — literal boolean behavior rules only
//!
//! Full expression evaluation lives in [`crate::evaluator`] and needs a context.

use serde_json::Value;
use tracing::debug;

use crate::ast::{
    BehaviorAction, BehaviorRule, BehaviorValue, ConstraintRule, DisplayProperty, DisplayRule,
    DisplayValue, EventTypeDeclaration, FieldDefinition, RecurrenceTemplate, ValidationRule,
};
use crate::event::{BehaviorConfig, Event, RenderedEvent, ValidationResult, DEFAULT_COLOR};
use crate::schema::derive_schema;

/// An event type ready for evaluation.
///
/// Immutable once built and free of interior mutability, so one instance can
/// serve concurrent `validate`/`render`/`can_perform` calls.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledEventType {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// JSON-Schema description of the event's `extra` payload.
    pub schema: Value,
    pub fields: Vec<FieldDefinition>,
    pub validate: Vec<ValidationRule>,
    pub display: Vec<DisplayRule>,
    pub behavior: Vec<BehaviorRule>,
    pub constraints: Vec<ConstraintRule>,
    pub recurring: Option<RecurrenceTemplate>,
    required_fields: Vec<String>,
    literal_color: Option<String>,
    literal_icon: Option<String>,
    behavior_defaults: BehaviorConfig,
}

/// Compile one declaration.
pub fn compile(declaration: &EventTypeDeclaration) -> CompiledEventType {
    let name = if declaration.name.is_empty() {
        declaration.id.clone()
    } else {
        declaration.name.clone()
    };

    let required_fields = declaration
        .fields
        .iter()
        .filter(|f| f.required)
        .map(|f| f.name.clone())
        .collect();

    let (literal_color, literal_icon) = literal_display(&declaration.display);
    let behavior_defaults = literal_behavior(&declaration.behavior);

    debug!(
        type_id = %declaration.id,
        fields = declaration.fields.len(),
        rules = declaration.validate.len(),
        "compiled event type"
    );

    CompiledEventType {
        id: declaration.id.clone(),
        name,
        description: declaration.description.clone(),
        schema: derive_schema(&declaration.fields),
        fields: declaration.fields.clone(),
        validate: declaration.validate.clone(),
        display: declaration.display.clone(),
        behavior: declaration.behavior.clone(),
        constraints: declaration.constraints.clone(),
        recurring: declaration.recurring.clone(),
        required_fields,
        literal_color,
        literal_icon,
        behavior_defaults,
    }
}

/// Compile every declaration, preserving order.
pub fn compile_all(declarations: &[EventTypeDeclaration]) -> Vec<CompiledEventType> {
    declarations.iter().map(compile).collect()
}

/// Last literal-string `color` and `icon` rule values. Computed values are
/// left for the evaluator.
fn literal_display(rules: &[DisplayRule]) -> (Option<String>, Option<String>) {
    let mut color = None;
    let mut icon = None;
    for rule in rules {
        let DisplayValue::Literal(Value::String(s)) = &rule.value else {
            continue;
        };
        match rule.name {
            DisplayProperty::Color => color = Some(s.clone()),
            DisplayProperty::Icon => icon = Some(s.clone()),
            _ => {}
        }
    }
    (color, icon)
}

fn literal_behavior(rules: &[BehaviorRule]) -> BehaviorConfig {
    let mut config = BehaviorConfig::default();
    for rule in rules {
        let BehaviorValue::Flag(allowed) = rule.value else {
            continue;
        };
        match rule.name {
            BehaviorAction::Draggable => config.draggable = allowed,
            BehaviorAction::Resizable => config.resizable = allowed,
            BehaviorAction::Editable => config.editable = allowed,
            BehaviorAction::Deletable => config.deletable = allowed,
            BehaviorAction::Other(_) => {}
        }
    }
    config
}

impl CompiledEventType {
    /// Names of fields declared `required`, in declaration order.
    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    /// Required-field presence check against `event.extra`.
    ///
    /// A field is missing when absent, `null`, or the empty string. Business
    /// rules are not evaluated here; see [`CompiledEventType::validate`].
    pub fn base_validate(&self, event: &Event) -> ValidationResult {
        let errors = self
            .required_fields
            .iter()
            .filter(|name| is_missing(event.extra.get(name.as_str())))
            .map(|name| format!("{} is required", name))
            .collect();
        ValidationResult::from_errors(errors)
    }

    /// Render using only literal display rules.
    pub fn base_render(&self, event: &Event) -> RenderedEvent {
        let color = self
            .literal_color
            .clone()
            .or_else(|| event.color.clone())
            .unwrap_or_else(|| DEFAULT_COLOR.to_string());

        RenderedEvent {
            title: event.title.clone().unwrap_or_else(|| self.name.clone()),
            color,
            icon: self.literal_icon.clone().map(Value::String),
            description: Some(String::new()),
            all_day: None,
            extra: Default::default(),
        }
    }

    /// Behavior flags from literal boolean rules over the defaults.
    /// Expression-valued rules are resolved by [`CompiledEventType::can_perform`].
    pub fn default_behavior(&self) -> BehaviorConfig {
        self.behavior_defaults
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

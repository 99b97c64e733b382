//! The declaration AST: closed variant types handed over by the DSL parser.
//!
//! Nothing in here has behavior beyond construction helpers and `Display`
//! impls used when rendering error messages. The JSON shape mirrors the
//! parser's output: rule and expression nodes are tagged by a `"type"` key,
//! literals are plain JSON values, and durations are `{value, unit}` objects.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::value::display_json;

/// Root of one declared event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeDeclaration {
    /// Type identifier, e.g. `"meeting"`.
    #[serde(rename = "type")]
    pub id: String,
    /// Display name. Falls back to `id` when empty.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub fields: Vec<FieldDefinition>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub validate: Vec<ValidationRule>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub display: Vec<DisplayRule>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub behavior: Vec<BehaviorRule>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub constraints: Vec<ConstraintRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<RecurrenceTemplate>,
}

impl EventTypeDeclaration {
    /// A declaration with only an id and a name; every rule list is empty.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            fields: Vec::new(),
            validate: Vec::new(),
            display: Vec::new(),
            behavior: Vec::new(),
            constraints: Vec::new(),
            recurring: None,
        }
    }

    /// Deserialize a single declaration from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Parse either a single declaration object or an array of declarations.
pub fn parse_declarations(json: &str) -> Result<Vec<EventTypeDeclaration>> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

/// Deserialize a rule list entry by entry, skipping entries whose shape is not
/// recognized so one bad node never rejects the whole declaration.
fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "skipping unrecognized declaration entry");
                None
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A declared field of the event's `extra` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
            min: None,
            max: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Primitive tags serialize as bare strings (`"email"`); composites as
/// single-key objects (`{"list": "number"}`, `{"enum": ["a", "b"]}`).
///
/// Any other tag is kept as `Unknown` and places no constraint on the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Email,
    Text,
    List(Box<FieldType>),
    Enum(Vec<String>),
    Unknown(Value),
}

impl From<Value> for FieldType {
    fn from(value: Value) -> Self {
        match &value {
            Value::String(tag) => match tag.as_str() {
                "string" => return FieldType::String,
                "number" => return FieldType::Number,
                "boolean" => return FieldType::Boolean,
                "email" => return FieldType::Email,
                "text" => return FieldType::Text,
                _ => {}
            },
            Value::Object(map) if map.len() == 1 => {
                if let Some(item) = map.get("list") {
                    return FieldType::List(Box::new(FieldType::from(item.clone())));
                }
                if let Some(Value::Array(values)) = map.get("enum") {
                    let names: Option<Vec<String>> = values
                        .iter()
                        .map(|v| v.as_str().map(str::to_string))
                        .collect();
                    if let Some(names) = names {
                        return FieldType::Enum(names);
                    }
                }
            }
            _ => {}
        }
        FieldType::Unknown(value)
    }
}

impl From<FieldType> for Value {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::String => Value::from("string"),
            FieldType::Number => Value::from("number"),
            FieldType::Boolean => Value::from("boolean"),
            FieldType::Email => Value::from("email"),
            FieldType::Text => Value::from("text"),
            FieldType::List(item) => serde_json::json!({ "list": Value::from(*item) }),
            FieldType::Enum(values) => serde_json::json!({ "enum": values }),
            FieldType::Unknown(raw) => raw,
        }
    }
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

/// A duration literal such as `{"value": 2, "unit": "hours"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationLiteral {
    pub value: f64,
    pub unit: String,
}

impl DurationLiteral {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

impl fmt::Display for DurationLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            display_json(&Value::from(self.value)),
            self.unit
        )
    }
}

/// A literal operand: any JSON value, or a duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Duration(DurationLiteral),
    Value(Value),
}

impl Literal {
    pub fn duration(value: f64, unit: impl Into<String>) -> Self {
        Literal::Duration(DurationLiteral::new(value, unit))
    }
}

impl From<Value> for Literal {
    fn from(value: Value) -> Self {
        Literal::Value(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Duration(d) => d.fmt(f),
            Literal::Value(v) => f.write_str(&display_json(v)),
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Boolean-valued expression nodes shared by conditions and rule trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    FieldAccess(FieldAccess),
    Comparison(Comparison),
    BinaryExpr(BinaryExpr),
    UnaryExpr(UnaryExpr),
}

impl Expression {
    pub fn field(path: &[&str]) -> Self {
        Expression::FieldAccess(FieldAccess::new(path))
    }

    pub fn compare(left: Operand, operator: ComparisonOperator, right: Literal) -> Self {
        Expression::Comparison(Comparison {
            operator,
            left,
            right,
        })
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::BinaryExpr(BinaryExpr::new(LogicalOperator::And, left, right))
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::BinaryExpr(BinaryExpr::new(LogicalOperator::Or, left, right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(argument: Expression) -> Self {
        Expression::UnaryExpr(UnaryExpr {
            operator: UnaryOperator::Not,
            argument: Box::new(argument),
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::FieldAccess(access) => access.fmt(f),
            Expression::Comparison(cmp) => cmp.fmt(f),
            Expression::BinaryExpr(bin) => bin.fmt(f),
            Expression::UnaryExpr(un) => un.fmt(f),
        }
    }
}

/// A dotted path into the event, its `extra` payload, or the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAccess {
    pub path: Vec<String>,
}

impl FieldAccess {
    pub fn new(path: &[&str]) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Display for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path.join("."))
    }
}

/// Left-hand side of a comparison: a nested expression or a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Expression(Box<Expression>),
    Literal(Literal),
}

impl Operand {
    pub fn field(path: &[&str]) -> Self {
        Operand::Expression(Box::new(Expression::field(path)))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Expression(expr) => expr.fmt(f),
            Operand::Literal(lit) => lit.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub operator: ComparisonOperator,
    pub left: Operand,
    pub right: Literal,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub operator: LogicalOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

impl BinaryExpr {
    pub fn new(operator: LogicalOperator, left: Expression, right: Expression) -> Self {
        Self {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl fmt::Display for BinaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.operator {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
        };
        write!(f, "({} {} {})", self.left, op, self.right)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub operator: UnaryOperator,
    pub argument: Box<Expression>,
}

impl fmt::Display for UnaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not {}", self.argument)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOperator {
    Not,
}

/// Comparison operators as written in the DSL.
///
/// Operator text the evaluator does not know is kept as `Unknown` so the
/// declaration still loads; such comparisons always evaluate to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComparisonOperator {
    Is,
    IsNot,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Unknown(String),
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &str {
        match self {
            ComparisonOperator::Is => "is",
            ComparisonOperator::IsNot => "is not",
            ComparisonOperator::Equals => "equals",
            ComparisonOperator::NotEquals => "not equals",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::Unknown(op) => op,
        }
    }
}

impl From<&str> for ComparisonOperator {
    fn from(op: &str) -> Self {
        match op {
            "is" => ComparisonOperator::Is,
            "is not" => ComparisonOperator::IsNot,
            "equals" => ComparisonOperator::Equals,
            "not equals" => ComparisonOperator::NotEquals,
            ">" => ComparisonOperator::GreaterThan,
            ">=" => ComparisonOperator::GreaterThanOrEqual,
            "<" => ComparisonOperator::LessThan,
            "<=" => ComparisonOperator::LessThanOrEqual,
            other => ComparisonOperator::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ComparisonOperator {
    fn from(op: String) -> Self {
        ComparisonOperator::from(op.as_str())
    }
}

impl From<ComparisonOperator> for String {
    fn from(op: ComparisonOperator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Validation rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ValidationRule {
    Between {
        field: FieldAccess,
        min: Literal,
        max: Literal,
    },
    In {
        field: FieldAccess,
        values: Vec<Literal>,
    },
    #[serde(rename_all = "camelCase")]
    ModComparison {
        left: FieldAccess,
        mod_value: Literal,
        operator: ComparisonOperator,
        right: Literal,
    },
    Comparison(Comparison),
    Conflict,
    NoConflict,
    When {
        condition: Expression,
        #[serde(deserialize_with = "lenient_list")]
        rules: Vec<ValidationRule>,
    },
    BinaryExpr(BinaryExpr),
    UnaryExpr(UnaryExpr),
    /// Any unrecognized rule kind. Never produces errors.
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Display rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRule {
    pub name: DisplayProperty,
    pub value: DisplayValue,
}

impl DisplayRule {
    pub fn new(name: DisplayProperty, value: DisplayValue) -> Self {
        Self { name, value }
    }
}

/// Rendered property a display rule writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DisplayProperty {
    Color,
    Icon,
    Title,
    Description,
    Other(String),
}

impl DisplayProperty {
    pub fn as_str(&self) -> &str {
        match self {
            DisplayProperty::Color => "color",
            DisplayProperty::Icon => "icon",
            DisplayProperty::Title => "title",
            DisplayProperty::Description => "description",
            DisplayProperty::Other(name) => name,
        }
    }
}

impl From<String> for DisplayProperty {
    fn from(name: String) -> Self {
        match name.as_str() {
            "color" => DisplayProperty::Color,
            "icon" => DisplayProperty::Icon,
            "title" => DisplayProperty::Title,
            "description" => DisplayProperty::Description,
            _ => DisplayProperty::Other(name),
        }
    }
}

impl From<DisplayProperty> for String {
    fn from(name: DisplayProperty) -> Self {
        name.as_str().to_string()
    }
}

/// Value of a display rule: a computed node or a plain literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayValue {
    Computed(DisplayExpression),
    Literal(Value),
}

impl DisplayValue {
    pub fn text(s: impl Into<String>) -> Self {
        DisplayValue::Literal(Value::String(s.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DisplayExpression {
    Conditional {
        condition: Expression,
        consequent: Box<DisplayValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alternate: Option<Box<DisplayValue>>,
    },
    Template {
        parts: Vec<TemplatePart>,
    },
}

/// One piece of a template: literal text, a field reference, or anything
/// else the parser produced (rendered as the empty string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplatePart {
    Text(String),
    Field(FieldAccess),
    Other(Value),
}

// ---------------------------------------------------------------------------
// Behavior rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRule {
    pub name: BehaviorAction,
    pub value: BehaviorValue,
}

impl BehaviorRule {
    pub fn flag(name: BehaviorAction, allowed: bool) -> Self {
        Self {
            name,
            value: BehaviorValue::Flag(allowed),
        }
    }

    pub fn when(name: BehaviorAction, condition: Expression) -> Self {
        Self {
            name,
            value: BehaviorValue::Expression(condition),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BehaviorAction {
    Draggable,
    Resizable,
    Editable,
    Deletable,
    Other(String),
}

impl BehaviorAction {
    pub fn as_str(&self) -> &str {
        match self {
            BehaviorAction::Draggable => "draggable",
            BehaviorAction::Resizable => "resizable",
            BehaviorAction::Editable => "editable",
            BehaviorAction::Deletable => "deletable",
            BehaviorAction::Other(name) => name,
        }
    }
}

impl From<String> for BehaviorAction {
    fn from(name: String) -> Self {
        match name.as_str() {
            "draggable" => BehaviorAction::Draggable,
            "resizable" => BehaviorAction::Resizable,
            "editable" => BehaviorAction::Editable,
            "deletable" => BehaviorAction::Deletable,
            _ => BehaviorAction::Other(name),
        }
    }
}

impl From<BehaviorAction> for String {
    fn from(name: BehaviorAction) -> Self {
        name.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BehaviorValue {
    Flag(bool),
    Expression(Expression),
}

// ---------------------------------------------------------------------------
// Constraints and recurrence
// ---------------------------------------------------------------------------

/// A named scheduling constraint, e.g. `maxDuration: 2 hours`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRule {
    pub name: String,
    pub value: ConstraintValue,
}

impl ConstraintRule {
    pub fn new(name: impl Into<String>, value: ConstraintValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintValue {
    Duration(DurationLiteral),
    Range { min: Literal, max: Literal },
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// RFC 5545 `FREQ` value.
    pub fn as_rrule(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

/// Recurrence descriptor, attached to a declaration as a template or to an
/// event as its concrete recurrence.
///
/// Integers are signed so out-of-range values still deserialize and reach
/// [`crate::recurrence::check_template`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceTemplate {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_dates: Vec<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

fn default_interval() -> i64 {
    1
}

impl RecurrenceTemplate {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            end_date: None,
            count: None,
            days_of_week: None,
            day_of_month: None,
            exclude_dates: Vec::new(),
            time_zone: None,
        }
    }
}

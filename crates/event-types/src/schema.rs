//! Structural schema derivation for an event type's `extra` payload.
//!
//! Emits a JSON-Schema draft-07 document. Enforcing it is the job of an
//! external schema validator; nothing in this crate re-checks it.

use serde_json::{json, Map, Value};

use crate::ast::{FieldDefinition, FieldType};

pub const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";

/// Build the object schema for a list of field definitions.
///
/// `required` lists the names of fields marked required, in declaration order,
/// and unknown properties are rejected (`additionalProperties: false`).
pub fn derive_schema(fields: &[FieldDefinition]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in fields {
        properties.insert(field.name.clone(), field_schema(field));
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
    }

    json!({
        "$schema": SCHEMA_DRAFT,
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// Schema fragment for one field: its type plus `default` and bounds.
pub fn field_schema(field: &FieldDefinition) -> Value {
    let mut fragment = type_fragment(&field.field_type);

    if let Value::Object(map) = &mut fragment {
        if let Some(default) = &field.default {
            map.insert("default".to_string(), default.clone());
        }
        if let Some((min_key, max_key)) = bound_keywords(&field.field_type) {
            if let Some(min) = field.min {
                map.insert(min_key.to_string(), number(min));
            }
            if let Some(max) = field.max {
                map.insert(max_key.to_string(), number(max));
            }
        }
    }

    fragment
}

fn type_fragment(field_type: &FieldType) -> Value {
    match field_type {
        FieldType::String | FieldType::Text => json!({ "type": "string" }),
        FieldType::Number => json!({ "type": "number" }),
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::Email => json!({ "type": "string", "format": "email" }),
        FieldType::List(item) => json!({ "type": "array", "items": type_fragment(item) }),
        FieldType::Enum(values) => json!({ "type": "string", "enum": values }),
        FieldType::Unknown(_) => json!({}),
    }
}

/// `min`/`max` map to item counts for arrays, values for numbers and
/// lengths for everything string-shaped. Booleans take no bounds.
fn bound_keywords(field_type: &FieldType) -> Option<(&'static str, &'static str)> {
    match field_type {
        FieldType::List(_) => Some(("minItems", "maxItems")),
        FieldType::Number => Some(("minimum", "maximum")),
        FieldType::Boolean | FieldType::Unknown(_) => None,
        FieldType::String | FieldType::Email | FieldType::Text | FieldType::Enum(_) => {
            Some(("minLength", "maxLength"))
        }
    }
}

/// Whole numbers are emitted as integers; length and count keywords require them.
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

//! # event-types
//!
//! Declarative calendar event types: describe a type once (fields, validation
//! rules, display rules, behavior rules, scheduling constraints), compile it,
//! then validate, render, and authorize concrete events against it.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use event_types::ast::{EventTypeDeclaration, FieldAccess, Literal, ValidationRule};
//! use event_types::{compile, Event, ValidationContext};
//! use serde_json::json;
//!
//! let mut meeting = EventTypeDeclaration::new("meeting", "Meeting");
//! meeting.validate.push(ValidationRule::Between {
//!     field: FieldAccess::new(&["extra", "priority"]),
//!     min: Literal::from(json!(1)),
//!     max: Literal::from(json!(10)),
//! });
//! let compiled = compile(&meeting);
//!
//! let start = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap();
//! let event = Event::new("e1", "meeting", start, end).with_extra("priority", json!(15));
//!
//! let result = compiled.validate(&event, &ValidationContext::default());
//! assert!(!result.valid);
//! assert_eq!(result.errors, vec!["extra.priority must be between 1 and 10"]);
//! ```
//!
//! ## Modules
//!
//! - [`ast`] — declaration AST: fields, rules, expressions, constraints, recurrence
//! - [`event`] — event records, evaluation contexts, and result shapes
//! - [`compiler`] — AST → [`CompiledEventType`] with literal-only fast paths
//! - [`schema`] — JSON-Schema derivation for the `extra` payload
//! - [`evaluator`] — validate / render / can_perform, field resolution, comparison
//! - [`conflict`] — interval-overlap detection against events in scope
//! - [`recurrence`] — recurrence descriptor checks and RRULE-based expansion
//! - [`value`] — runtime values and coercions
//! - [`error`] — Error types

pub mod ast;
pub mod compiler;
pub mod conflict;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod recurrence;
pub mod schema;
pub mod value;

pub use ast::{parse_declarations, EventTypeDeclaration};
pub use compiler::{compile, compile_all, CompiledEventType};
pub use conflict::find_conflicts;
pub use error::EventTypeError;
pub use evaluator::{compare_values, get_field_value, get_literal_value};
pub use event::{
    BehaviorConfig, Event, RenderContext, RenderedEvent, ValidationContext, ValidationResult,
};
pub use recurrence::{expand_occurrences, Occurrence};
pub use value::FieldValue;

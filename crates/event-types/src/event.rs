//! Event records and the per-call contexts and results of the evaluator.
//!
//! Events are produced by callers; the crate only reads them. Instants are
//! `DateTime<Utc>` in memory and ISO-8601 strings on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ast::RecurrenceTemplate;
use crate::error::Result;

/// Color used when neither the event nor a display rule provides one.
pub const DEFAULT_COLOR: &str = "#4285f4";

/// A concrete calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Open extension payload, shaped by the type's derived schema.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<RecurrenceTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventMetadata>,
}

impl Event {
    /// An event with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            title: None,
            start_time,
            end_time,
            color: None,
            icon: None,
            extra: Map::new(),
            time_zone: None,
            all_day: None,
            recurring: None,
            parent_event_id: None,
            recurrence_id: None,
            metadata: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Contexts
// ---------------------------------------------------------------------------

/// Inputs to `validate` beyond the event itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    /// Other events in scope, consulted by conflict rules.
    pub events: &'a [Event],
    /// Current instant. Advance-window checks are skipped when absent.
    pub now: Option<DateTime<Utc>>,
    /// The acting user, reachable through `user.*` field paths.
    pub user: Option<&'a Value>,
}

impl<'a> ValidationContext<'a> {
    pub fn with_events(mut self, events: &'a [Event]) -> Self {
        self.events = events;
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn as_user(mut self, user: &'a Value) -> Self {
        self.user = Some(user);
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext<'a> {
    pub user: Option<&'a Value>,
}

impl<'a> From<RenderContext<'a>> for ValidationContext<'a> {
    fn from(ctx: RenderContext<'a>) -> Self {
        ValidationContext {
            events: Default::default(),
            now: None,
            user: ctx.user,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Presentation of an event after display rules are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedEvent {
    pub title: String,
    pub color: String,
    /// Not coerced: an icon rule may yield a structured value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    /// Results of display rules outside the four known properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Interaction permissions for an event in a calendar UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorConfig {
    pub draggable: bool,
    pub resizable: bool,
    pub editable: bool,
    pub deletable: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            draggable: true,
            resizable: false,
            editable: true,
            deletable: true,
        }
    }
}

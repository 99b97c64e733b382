//! Error types for the fallible edges of the crate.
//!
//! Compiling, validating, rendering and authorizing never fail: problems found
//! there are reported as data. Only the JSON hand-off and recurrence expansion
//! can return an [`EventTypeError`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventTypeError {
    /// A declaration or event document was not valid JSON for the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Expansion error: {0}")]
    Expansion(String),
}

pub type Result<T> = std::result::Result<T, EventTypeError>;

//! Field-mapping conversion engine
//!
//! Every source format is converted by walking its record and dispatching
//! each key to a handler registered in a [`HandlerTable`]. Converters only
//! supply their table, a context type for cross-field state and optional
//! prepare/finish hooks; the traversal itself lives in [`Convert`].

pub mod element;
pub mod engine;

pub use element::Element;
pub use engine::{Convert, FallbackPolicy, Handler, HandlerTable};

use thiserror::Error;

/// Errors raised while converting a single source record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("{converter}: no handler for key '{key}'{}", record_suffix(.record))]
    UnmappedKey {
        converter: &'static str,
        key: String,
        record: Option<String>,
    },

    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("invalid field path '{0}'")]
    InvalidPath(String),

    #[error("xml error: {0}")]
    Xml(String),
}

impl ConvertError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConvertError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Attach the identifier of the record being converted, if not already set
    pub fn for_record(self, id: impl Into<String>) -> Self {
        match self {
            ConvertError::UnmappedKey {
                converter,
                key,
                record: None,
            } => ConvertError::UnmappedKey {
                converter,
                key,
                record: Some(id.into()),
            },
            other => other,
        }
    }

    /// The unmapped key, when this is a missing-mapping error
    pub fn unmapped_key(&self) -> Option<&str> {
        match self {
            ConvertError::UnmappedKey { key, .. } => Some(key),
            _ => None,
        }
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;

fn record_suffix(record: &Option<String>) -> String {
    record
        .as_ref()
        .map(|id| format!(" (record {})", id))
        .unwrap_or_default()
}

use std::{fmt::Display, time::SystemTime};

use thiserror::Error;

/// Metadata for a single object as reported by the backing store.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: i64,
    pub modified_time: SystemTime,
}

/// One page of a listing. `continuation_token` is `None` on the last page.
#[derive(Clone, Debug, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectMeta>,
    pub continuation_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("no object at: {key}, {message}")]
    NotFound { key: String, message: String },

    #[error("failed to {operation} at: {key}, {message}")]
    Backend {
        operation: &'static str,
        key: String,
        message: String,
    },
}

impl ObjectError {
    /// `err` is the backend's own report, kept for diagnostics.
    pub fn not_found(key: &str, err: impl Display) -> Self {
        ObjectError::NotFound {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn backend(operation: &'static str, key: &str, err: impl Display) -> Self {
        ObjectError::Backend {
            operation,
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectError::NotFound { .. })
    }
}

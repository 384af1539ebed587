use std::time::SystemTime;

use thiserror::Error;

use crate::model::object::ObjectError;

/// Snapshot of a stored item's metadata.
///
/// The zero value (see [`Default`]) stands for "unknown or absent": `Stat`
/// returns it instead of an error when the metadata probe fails.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyInfo {
    /// Physical key, configured prefix included.
    pub key: String,
    pub modified: SystemTime,
    pub size: i64,
    /// True when the physical key ends in a path separator.
    pub is_terminal: bool,
}

impl Default for KeyInfo {
    fn default() -> Self {
        Self {
            key: String::new(),
            modified: SystemTime::UNIX_EPOCH,
            size: 0,
            is_terminal: false,
        }
    }
}

impl KeyInfo {
    pub fn is_zero(&self) -> bool {
        *self == KeyInfo::default()
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{key}: not found")]
    NotFound {
        key: String,
        #[source]
        source: ObjectError,
    },

    #[error("{operation} {key}: {source}")]
    Backend {
        operation: &'static str,
        key: String,
        #[source]
        source: ObjectError,
    },

    #[error("{operation} {key:?}: key names nothing below the prefix")]
    InvalidKey { operation: &'static str, key: String },

    #[error("{operation} {key}: cancelled")]
    Cancelled { operation: &'static str, key: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StorageError {
    pub fn backend(operation: &'static str, key: &str, source: ObjectError) -> Self {
        StorageError::Backend {
            operation,
            key: key.to_string(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled { .. })
    }
}
